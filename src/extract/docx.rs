use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{ExtractError, Extractor};

const DOCUMENT_PART: &str = "word/document.xml";

/// Word documents: paragraphs and table rows in document order, separated by blank lines.
///
/// Table cells are joined with ` | `; rows and paragraphs with only whitespace are skipped.
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &["docx"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError::failed("unreadable DOCX archive", e))?;
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| ExtractError::failed(DOCUMENT_PART, e))?
            .read_to_string(&mut xml)
            .map_err(|e| ExtractError::failed(DOCUMENT_PART, e))?;

        let blocks = document_blocks(&xml)?;
        Ok(blocks.join("\n\n"))
    }
}

/// Walk the WordprocessingML body, collecting one block per paragraph or table row.
fn document_blocks(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut walker = BodyWalker::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => walker.open(&element),
            Ok(Event::Empty(element)) => {
                walker.open(&element);
                walker.close(element.local_name().as_ref());
            }
            Ok(Event::End(element)) => walker.close(element.local_name().as_ref()),
            Ok(Event::Text(text)) if walker.in_text_run => {
                let text = text
                    .unescape()
                    .map_err(|e| ExtractError::failed(DOCUMENT_PART, e))?;
                walker.paragraph.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::failed(
                    &format!("{DOCUMENT_PART} at byte {}", reader.buffer_position()),
                    e,
                ));
            }
        }
    }

    Ok(walker.blocks)
}

#[derive(Default)]
struct BodyWalker {
    blocks: Vec<String>,
    paragraph: String,
    cell: String,
    row: Vec<String>,
    table_depth: usize,
    in_text_run: bool,
}

impl BodyWalker {
    fn open(&mut self, element: &BytesStart<'_>) {
        match element.local_name().as_ref() {
            b"p" => self.paragraph.clear(),
            b"t" => self.in_text_run = true,
            b"tab" => self.paragraph.push('\t'),
            b"br" | b"cr" => self.paragraph.push('\n'),
            b"tbl" => self.table_depth += 1,
            b"tr" if self.table_depth == 1 => self.row.clear(),
            b"tc" if self.table_depth == 1 => self.cell.clear(),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text_run = false,
            b"p" => {
                let paragraph = std::mem::take(&mut self.paragraph);
                if self.table_depth == 0 {
                    if !paragraph.trim().is_empty() {
                        self.blocks.push(paragraph);
                    }
                } else {
                    if !self.cell.is_empty() {
                        self.cell.push('\n');
                    }
                    self.cell.push_str(&paragraph);
                }
            }
            b"tc" if self.table_depth == 1 => {
                let cell = std::mem::take(&mut self.cell);
                self.row.push(cell.trim().to_string());
            }
            b"tr" if self.table_depth == 1 => {
                let row = std::mem::take(&mut self.row);
                if row.iter().any(|cell| !cell.is_empty()) {
                    self.blocks.push(row.join(" | "));
                }
            }
            b"tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            _ => {}
        }
    }
}
