//! Reflowable EPUB writer. Consumes the chapter list and writes an EPUB 3
//! archive (mimetype, container, OPF, nav, NCX, one XHTML section per
//! chapter) with the spine in corpus order.

use crate::model::Chapter;
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";

/// Errors from the EPUB writer.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot write EPUB: title is empty.")]
    EmptyTitle,

    #[error("Cannot write EPUB: no chapters.")]
    NoChapters,

    #[error("Failed to create EPUB file: {path}: {source}")]
    CreateFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for EpubError {
    fn from(e: std::io::Error) -> Self {
        EpubError::Zip(zip::result::ZipError::Io(e))
    }
}

/// Write the chapter list to an EPUB file.
///
/// One addressable section and one TOC entry per chapter, in input order.
/// Each section renders the heading, the subheading, and one `<p>` per body
/// paragraph, so the section count and per-section paragraph count always
/// match the corpus. Both nav.xhtml and toc.ncx are included.
pub fn write_epub(
    title: &str,
    author: &str,
    chapters: &[Chapter],
    path: &Path,
) -> Result<(), EpubError> {
    if title.trim().is_empty() {
        return Err(EpubError::EmptyTitle);
    }
    if chapters.is_empty() {
        return Err(EpubError::NoChapters);
    }

    let path = path.to_path_buf();
    let file = std::fs::File::create(&path).map_err(|e| EpubError::CreateFile {
        path: path.clone(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);

    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // Mimetype first, uncompressed (required by the EPUB container spec).
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML)?;

    write_opf(title, author, chapters, &mut zip, options_deflate)?;
    write_nav_xhtml(chapters, &mut zip, options_deflate)?;
    write_ncx(title, chapters, &mut zip, options_deflate)?;
    write_chapters(chapters, &mut zip, options_deflate)?;

    zip.finish()?;
    Ok(())
}

fn identifier(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("urn:wparchive:{}", slug.trim_matches('-'))
}

fn write_opf(
    title: &str,
    author: &str,
    chapters: &[Chapter],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let id = xml_escape(&identifier(title));
    let title = xml_escape(title);
    let creator = xml_escape(author);

    let mut manifest = String::from(
        r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
  <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
"#,
    );
    for i in 1..=chapters.len() {
        manifest.push_str(&format!(
            r#"  <item id="chapter-{i}" href="chapter-{i}.xhtml" media-type="application/xhtml+xml"/>
"#
        ));
    }

    let mut spine = String::new();
    for i in 1..=chapters.len() {
        if !spine.is_empty() {
            spine.push_str("\n  ");
        }
        spine.push_str(&format!("<itemref idref=\"chapter-{}\"/>", i));
    }

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="3.0"
  xmlns:dc="http://purl.org/dc/elements/1.1/">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{creator}</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
  {spine}
  </spine>
</package>
"#
    );

    zip.start_file(format!("{}content.opf", OEBPS_PREFIX), options)?;
    zip.write_all(opf.as_bytes())?;
    Ok(())
}

fn write_nav_xhtml(
    chapters: &[Chapter],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut nav_links = String::new();
    for (i, ch) in chapters.iter().enumerate() {
        nav_links.push_str(&format!(
            r#"    <li><a href="chapter-{}.xhtml">{}</a></li>
"#,
            i + 1,
            html_escape(&ch.heading)
        ));
    }
    let nav = format!(
        r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
  <meta charset="UTF-8"/>
  <title>Table of Contents</title>
</head>
<body>
  <nav epub:type="toc">
    <h1>Contents</h1>
    <ol>
{}
    </ol>
  </nav>
</body>
</html>
"#,
        nav_links
    );
    zip.start_file(format!("{}nav.xhtml", OEBPS_PREFIX), options)?;
    zip.write_all(nav.as_bytes())?;
    Ok(())
}

fn write_ncx(
    title: &str,
    chapters: &[Chapter],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut nav_points = String::new();
    for (i, ch) in chapters.iter().enumerate() {
        nav_points.push_str(&format!(
            r#"    <navPoint id="navpoint-{n}" playOrder="{n}">
      <navLabel><text>{label}</text></navLabel>
      <content src="chapter-{n}.xhtml"/>
    </navPoint>
"#,
            n = i + 1,
            label = xml_escape(&ch.heading)
        ));
    }
    let ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <navMap>
{}
  </navMap>
</ncx>
"#,
        xml_escape(&identifier(title)),
        xml_escape(title),
        nav_points
    );
    zip.start_file(format!("{}toc.ncx", OEBPS_PREFIX), options)?;
    zip.write_all(ncx.as_bytes())?;
    Ok(())
}

fn write_chapters(
    chapters: &[Chapter],
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    for (i, ch) in chapters.iter().enumerate() {
        let mut body = format!(
            "<h1>{}</h1>\n<h4>{}</h4>\n",
            html_escape(&ch.heading),
            html_escape(&ch.subheading)
        );
        for p in &ch.paragraphs {
            body.push_str(&format!("<p>{}</p>\n", html_escape(p)));
        }
        let html = format!(
            r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <meta charset="UTF-8"/>
  <title>{}</title>
</head>
<body>
{}</body>
</html>
"#,
            html_escape(&ch.heading),
            body
        );
        let name = format!("{}chapter-{}.xhtml", OEBPS_PREFIX, i + 1);
        zip.start_file(name, options)?;
        zip.write_all(html.as_bytes())?;
    }
    Ok(())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::read::ZipArchive;

    fn chapters(n: usize) -> Vec<Chapter> {
        (1..=n)
            .map(|i| Chapter {
                heading: format!("Chapter {}", i),
                subheading: format!("2023-01-{:02}T00:00:00", i),
                paragraphs: vec![
                    format!("First paragraph of chapter {}.", i),
                    "Second paragraph.".to_string(),
                ],
            })
            .collect()
    }

    fn temp_epub(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("wparchive_epub_{}_{}.epub", name, std::process::id()))
    }

    #[test]
    fn rejects_empty_title() {
        let path = temp_epub("no_title");
        let result = write_epub("  ", "Someone", &chapters(1), &path);
        assert!(matches!(result, Err(EpubError::EmptyTitle)));
    }

    #[test]
    fn rejects_no_chapters() {
        let path = temp_epub("no_chapters");
        let result = write_epub("Living Safely", "Someone", &[], &path);
        assert!(matches!(result, Err(EpubError::NoChapters)));
    }

    #[test]
    fn archive_has_required_entries() {
        let path = temp_epub("entries");
        write_epub("Living Safely", "Translations", &chapters(2), &path).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let zip = ZipArchive::new(file).unwrap();
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        assert!(names.contains(&"mimetype".to_string()));
        assert!(names.contains(&"META-INF/container.xml".to_string()));
        assert!(names.contains(&"OEBPS/content.opf".to_string()));
        assert!(names.contains(&"OEBPS/nav.xhtml".to_string()));
        assert!(names.contains(&"OEBPS/toc.ncx".to_string()));
        assert!(names.contains(&"OEBPS/chapter-1.xhtml".to_string()));
        assert!(names.contains(&"OEBPS/chapter-2.xhtml".to_string()));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn section_count_matches_chapter_count() {
        let path = temp_epub("sections");
        let chapters = chapters(5);
        write_epub("Living Safely", "Translations", &chapters, &path).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let zip = ZipArchive::new(file).unwrap();
        let section_count = zip
            .file_names()
            .filter(|n| n.starts_with("OEBPS/chapter-"))
            .count();
        assert_eq!(section_count, chapters.len());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn section_renders_one_p_per_paragraph() {
        let path = temp_epub("paragraphs");
        let chapters = chapters(1);
        write_epub("Living Safely", "Translations", &chapters, &path).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let mut zip = ZipArchive::new(file).unwrap();
        let mut xhtml = String::new();
        zip.by_name("OEBPS/chapter-1.xhtml")
            .unwrap()
            .read_to_string(&mut xhtml)
            .unwrap();
        assert_eq!(xhtml.matches("<p>").count(), chapters[0].paragraphs.len());
        assert!(xhtml.contains("<h1>Chapter 1</h1>"));
        assert!(xhtml.contains("<h4>2023-01-01T00:00:00</h4>"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn nav_lists_chapters_in_corpus_order() {
        let path = temp_epub("nav_order");
        write_epub("Living Safely", "Translations", &chapters(3), &path).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let mut zip = ZipArchive::new(file).unwrap();
        let mut nav = String::new();
        zip.by_name("OEBPS/nav.xhtml")
            .unwrap()
            .read_to_string(&mut nav)
            .unwrap();
        let first = nav.find("Chapter 1").unwrap();
        let second = nav.find("Chapter 2").unwrap();
        let third = nav.find("Chapter 3").unwrap();
        assert!(first < second && second < third);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn headings_are_escaped() {
        let path = temp_epub("escape");
        let ch = Chapter {
            heading: "Cats & <Dogs>".to_string(),
            subheading: "No Date".to_string(),
            paragraphs: vec!["Text.".to_string()],
        };
        write_epub("T & T", "A", &[ch], &path).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let mut zip = ZipArchive::new(file).unwrap();
        let mut xhtml = String::new();
        zip.by_name("OEBPS/chapter-1.xhtml")
            .unwrap()
            .read_to_string(&mut xhtml)
            .unwrap();
        assert!(xhtml.contains("Cats &amp; &lt;Dogs&gt;"));
        std::fs::remove_file(&path).ok();
    }
}
