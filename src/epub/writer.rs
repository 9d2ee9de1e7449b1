//! Write a [`Book`] back out as an EPUB archive.

use std::io::{self, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::book::Book;

/// Write a [`Book`] to an EPUB file on disk.
///
/// The OPF package document is regenerated from the book's current state,
/// so resources registered since reading (such as marker images) are listed
/// in the manifest.
pub fn write_epub<P: AsRef<Path>>(book: &Book, path: P) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_epub_to_writer(book, file)
}

/// Write a [`Book`] to any [`Write`] + [`Seek`] destination.
pub fn write_epub_to_writer<W: Write + Seek>(book: &Book, writer: W) -> io::Result<()> {
    let mut zip = ZipWriter::new(writer);

    // mimetype must be first and uncompressed
    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", options_stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    let opf = generate_opf(book);
    zip.start_file("OEBPS/content.opf", options_deflate)?;
    zip.write_all(opf.as_bytes())?;

    for (name, resource) in &book.resources {
        if name == "content.opf" {
            continue;
        }
        let path = format!("OEBPS/{}", name);
        zip.start_file(&path, options_deflate)?;
        zip.write_all(&resource.data)?;
    }

    zip.finish()?;
    Ok(())
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn generate_opf(book: &Book) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&book.metadata.title)
    ));

    let identifier = if book.metadata.identifier.is_empty() {
        "qrtracker-generated"
    } else {
        book.metadata.identifier.as_str()
    };
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(identifier)
    ));

    let language = if book.metadata.language.is_empty() {
        "en"
    } else {
        book.metadata.language.as_str()
    };
    opf.push_str(&format!("    <dc:language>{}</dc:language>\n", language));

    for author in &book.metadata.authors {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_xml(author)
        ));
    }

    if let Some(ref description) = book.metadata.description {
        opf.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            escape_xml(description)
        ));
    }

    if let Some(ref series) = book.metadata.series {
        opf.push_str(&format!(
            "    <meta name=\"calibre:series\" content=\"{}\"/>\n",
            escape_xml(series)
        ));
    }
    if let Some(index) = book.metadata.series_index {
        opf.push_str(&format!(
            "    <meta name=\"calibre:series_index\" content=\"{}\"/>\n",
            index
        ));
    }

    if let Some(ref cover) = book.metadata.cover_image {
        opf.push_str(&format!(
            "    <meta name=\"cover\" content=\"{}\"/>\n",
            escape_xml(&name_to_id(cover))
        ));
    }

    opf.push_str("  </metadata>\n  <manifest>\n");

    for (name, resource) in &book.resources {
        let properties = match &resource.properties {
            Some(props) => format!(" properties=\"{}\"", escape_xml(props)),
            None => String::new(),
        };
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            name_to_id(name),
            escape_xml(name),
            escape_xml(&resource.media_type),
            properties
        ));
    }

    // Reuse an existing NCX for the spine toc reference, if the book has one
    let ncx = book
        .resources
        .iter()
        .find(|(_, r)| r.media_type == "application/x-dtbncx+xml")
        .map(|(name, _)| name_to_id(name));

    match ncx {
        Some(id) => opf.push_str(&format!("  </manifest>\n  <spine toc=\"{}\">\n", id)),
        None => opf.push_str("  </manifest>\n  <spine>\n"),
    }

    for item in &book.spine {
        opf.push_str(&format!(
            "    <itemref idref=\"{}\"/>\n",
            name_to_id(&item.name)
        ));
    }

    opf.push_str("  </spine>\n");

    if let Some(ref cover_page) = book.metadata.cover_page {
        opf.push_str(&format!(
            "  <guide>\n    <reference type=\"cover\" title=\"Cover\" href=\"{}\"/>\n  </guide>\n",
            escape_xml(cover_page)
        ));
    }

    opf.push_str("</package>\n");
    opf
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn name_to_id(name: &str) -> String {
    name.replace(['/', '.', ' ', '-'], "_")
}
