//! Read an EPUB archive into a [`Book`].

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::book::{Book, Metadata, Resource};
use crate::error::{Error, Result};
use crate::util::{decode_text, normalize_name, strip_bom};

/// Parsed OPF content.
struct OpfData {
    metadata: Metadata,
    /// Maps manifest id -> item.
    manifest: HashMap<String, ManifestItem>,
    spine_ids: Vec<String>,
    /// Guide references: (type, href).
    guide: Vec<(String, String)>,
}

struct ManifestItem {
    href: String,
    media_type: String,
    properties: Option<String>,
}

/// Read an EPUB file from disk into a [`Book`].
///
/// Supports EPUB 2 and EPUB 3. Resource names are relative to the OPF
/// directory, matching how content documents reference each other.
pub fn read_epub<P: AsRef<Path>>(path: P) -> Result<Book> {
    let file = std::fs::File::open(path)?;
    read_epub_from_reader(file)
}

/// Read an EPUB from any [`Read`] + [`Seek`] source.
pub fn read_epub_from_reader<R: Read + Seek>(reader: R) -> Result<Book> {
    let mut archive = ZipArchive::new(reader)?;

    let opf_path = find_opf_path(&mut archive)?;
    let opf_dir = Path::new(&opf_path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    let opf_content = read_archive_file(&mut archive, &opf_path)?;
    let OpfData {
        mut metadata,
        manifest,
        spine_ids,
        guide,
    } = parse_opf(&opf_content)?;

    let mut book = Book::new();

    for item in manifest.values() {
        let name = normalize_name(&item.href);
        let full_path = resolve_path(&opf_dir, &name);
        if let Ok(data) = read_archive_file_bytes(&mut archive, &full_path) {
            book.resources.insert(
                name,
                Resource {
                    data,
                    media_type: item.media_type.clone(),
                    properties: item.properties.clone(),
                },
            );
        }
    }

    for id in spine_ids {
        if let Some(item) = manifest.get(&id) {
            book.add_spine_item(&id, normalize_name(&item.href), item.media_type.clone());
        }
    }

    // Guide "cover" reference identifies the cover page document
    for (ref_type, href) in guide {
        if ref_type.eq_ignore_ascii_case("cover") {
            let name = normalize_name(href.split('#').next().unwrap_or(&href));
            if book.resources.contains_key(&name) {
                metadata.cover_page = Some(name);
            }
            break;
        }
    }

    book.metadata = metadata;
    Ok(book)
}

fn find_opf_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let container = read_archive_file(archive, "META-INF/container.xml")?;

    let mut reader = Reader::from_str(&container);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8(attr.value.to_vec())?);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "No rootfile found in container.xml".into(),
    ))
}

fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut metadata = Metadata::default();
    let mut manifest: HashMap<String, ManifestItem> = HashMap::new();
    let mut spine_ids: Vec<String> = Vec::new();
    let mut guide: Vec<(String, String)> = Vec::new();
    let mut epub2_cover_id: Option<String> = None;

    let mut in_metadata = false;
    let mut current_element: Option<String> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"language" | b"identifier" | b"description" => {
                        if in_metadata {
                            current_element = Some(String::from_utf8_lossy(local).to_string());
                            buf_text.clear();
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"item" => {
                        let mut id = String::new();
                        let mut href = String::new();
                        let mut media_type = String::new();
                        let mut properties: Option<String> = None;

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"id" => id = String::from_utf8(attr.value.to_vec())?,
                                b"href" => href = String::from_utf8(attr.value.to_vec())?,
                                b"media-type" => {
                                    media_type = String::from_utf8(attr.value.to_vec())?
                                }
                                b"properties" => {
                                    properties = Some(String::from_utf8(attr.value.to_vec())?)
                                }
                                _ => {}
                            }
                        }

                        if !id.is_empty() {
                            manifest.insert(
                                id,
                                ManifestItem {
                                    href,
                                    media_type,
                                    properties,
                                },
                            );
                        }
                    }
                    b"itemref" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"idref" {
                                spine_ids.push(String::from_utf8(attr.value.to_vec())?);
                            }
                        }
                    }
                    b"reference" => {
                        let mut ref_type = String::new();
                        let mut href = String::new();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"type" => ref_type = String::from_utf8(attr.value.to_vec())?,
                                b"href" => href = String::from_utf8(attr.value.to_vec())?,
                                _ => {}
                            }
                        }
                        if !ref_type.is_empty() && !href.is_empty() {
                            guide.push((ref_type, href));
                        }
                    }
                    b"meta" => {
                        // EPUB2 cover + calibre series extensions
                        let mut meta_name = String::new();
                        let mut meta_content = String::new();

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"name" => {
                                    meta_name = String::from_utf8(attr.value.to_vec())?
                                }
                                b"content" => {
                                    meta_content = String::from_utf8(attr.value.to_vec())?
                                }
                                _ => {}
                            }
                        }

                        match meta_name.as_str() {
                            "cover" if !meta_content.is_empty() => {
                                epub2_cover_id = Some(meta_content)
                            }
                            "calibre:series" if !meta_content.is_empty() => {
                                metadata.series = Some(meta_content)
                            }
                            "calibre:series_index" => {
                                metadata.series_index = meta_content.parse().ok()
                            }
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                // Entity references like &apos; inside metadata text
                if current_element.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    let resolved = match entity.as_ref() {
                        "apos" => "'",
                        "quot" => "\"",
                        "lt" => "<",
                        "gt" => ">",
                        "amp" => "&",
                        _ => "",
                    };
                    buf_text.push_str(resolved);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if local == b"metadata" {
                    in_metadata = false;
                }

                if let Some(ref elem) = current_element {
                    match elem.as_str() {
                        "title" => metadata.title = buf_text.clone(),
                        "creator" => metadata.authors.push(buf_text.clone()),
                        "language" => metadata.language = buf_text.clone(),
                        "identifier" => {
                            if metadata.identifier.is_empty() {
                                metadata.identifier = buf_text.clone();
                            }
                        }
                        "description" => metadata.description = Some(buf_text.clone()),
                        _ => {}
                    }
                    current_element = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    // Cover image: EPUB3 "cover-image" property wins over the EPUB2 meta
    let epub3_cover = manifest.values().find(|item| {
        item.properties
            .as_ref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == "cover-image"))
    });

    if let Some(cover_item) = epub3_cover {
        metadata.cover_image = Some(normalize_name(&cover_item.href));
    } else if let Some(cover_id) = epub2_cover_id {
        if let Some(item) = manifest.get(&cover_id) {
            metadata.cover_image = Some(normalize_name(&item.href));
        }
    }

    Ok(OpfData {
        metadata,
        manifest,
        spine_ids,
        guide,
    })
}

fn read_archive_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let bytes = read_archive_file_bytes(archive, path)?;
    Ok(decode_text(strip_bom(&bytes), None).into_owned())
}

fn read_archive_file_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<u8>> {
    match archive.by_name(path) {
        Ok(mut file) => {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            return Ok(contents);
        }
        Err(zip::result::ZipError::FileNotFound) => {}
        Err(e) => return Err(e.into()),
    }

    // Fallback: percent-decoded path (handles malformed EPUBs)
    let decoded = percent_encoding::percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| Error::InvalidEpub(format!("Invalid UTF-8 in path: {}", path)))?;

    let mut file = archive.by_name(&decoded)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

fn resolve_path(base: &str, href: &str) -> String {
    if base.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", base, href)
    }
}

/// Extract local name from a potentially namespaced XML name.
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}
