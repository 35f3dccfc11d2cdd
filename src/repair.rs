use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use lopdf::{Document, Object, ObjectId, Stream};
use rayon::prelude::*;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::tokenizer::{ContentTokenizer, TokenizeError, Tokenizer, canonicalize_content};

/// Set to anything but `0` to canonicalize pages one after another.
pub const SEQUENTIAL_ENV: &str = "PDF_REPAIR_SEQUENTIAL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairOptions {
    /// Canonicalize page streams on the rayon pool.
    pub parallel: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        RepairOptions { parallel: true }
    }
}

impl RepairOptions {
    pub fn sequential() -> Self {
        RepairOptions { parallel: false }
    }

    pub fn from_env() -> Self {
        match std::env::var(SEQUENTIAL_ENV) {
            Ok(v) if !v.is_empty() && v != "0" => Self::sequential(),
            _ => Self::default(),
        }
    }
}

/// Why a page kept its original content stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("page dictionary could not be read")]
    UnreadablePage,
    #[error("page has no /Contents")]
    NoContents,
    #[error("/Contents is not a single stream")]
    NotStream,
    #[error("stream filters could not be decoded: {0}")]
    Undecodable(String),
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error("canonical stream could not be stored: {0}")]
    WriteBack(String),
}

impl SkipReason {
    /// Skips caused by content that could not be read, as opposed to pages
    /// that simply have nothing to repair.
    pub fn is_failure(&self) -> bool {
        !matches!(self, SkipReason::NoContents | SkipReason::NotStream)
    }
}

/// Per-page outcome of one repair pass. Page numbers are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub pages: usize,
    pub repaired: Vec<u32>,
    pub skipped: Vec<(u32, SkipReason)>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.iter().all(|(_, reason)| !reason.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &(u32, SkipReason)> {
        self.skipped.iter().filter(|(_, reason)| reason.is_failure())
    }

    fn skip(&mut self, page: u32, reason: SkipReason) {
        if reason.is_failure() {
            log::warn!("page {page}: left untouched, {reason}");
        } else {
            log::debug!("page {page}: left untouched, {reason}");
        }
        self.skipped.push((page, reason));
    }
}

// ========== content location ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ContentSlot {
    /// `/Contents n 0 R` pointing at a stream object.
    Indirect(ObjectId),
    /// A stream stored directly in the page dictionary.
    Inline(ObjectId),
}

struct PageJob {
    slot: ContentSlot,
    pages: Vec<u32>,
    raw: Vec<u8>,
}

fn locate_content(doc: &Document, page_id: ObjectId) -> std::result::Result<(ContentSlot, &Stream), SkipReason> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|_| SkipReason::UnreadablePage)?;
    let contents = page.get(b"Contents").map_err(|_| SkipReason::NoContents)?;

    match contents {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Stream(stream)) => Ok((ContentSlot::Indirect(*id), stream)),
            Ok(_) => Err(SkipReason::NotStream),
            // a dangling reference reads as null
            Err(_) => Err(SkipReason::NoContents),
        },
        Object::Stream(stream) => Ok((ContentSlot::Inline(page_id), stream)),
        Object::Null => Err(SkipReason::NoContents),
        _ => Err(SkipReason::NotStream),
    }
}

fn decode_stream(stream: &Stream) -> std::result::Result<Vec<u8>, SkipReason> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| SkipReason::Undecodable(e.to_string()))
    } else {
        Ok(stream.content.clone())
    }
}

// ========== rewrite ==========

/// Unfiltered copy of `old` carrying `content`; every other dictionary entry
/// is kept and `/Length` follows the new content.
fn canonical_stream(old: &Stream, content: Vec<u8>) -> Stream {
    let mut dict = old.dict.clone();
    dict.remove(b"Filter");
    dict.remove(b"DecodeParms");
    dict.remove(b"DL");
    Stream::new(dict, content)
}

fn replace_content(doc: &mut Document, slot: ContentSlot, content: Vec<u8>) -> lopdf::Result<()> {
    let stream = match slot {
        ContentSlot::Indirect(id) => doc.get_object_mut(id)?.as_stream_mut()?,
        ContentSlot::Inline(page_id) => doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .get_mut(b"Contents")?
            .as_stream_mut()?,
    };
    let replacement = canonical_stream(stream, content);
    *stream = replacement;
    Ok(())
}

/// Store the canonical bytes of one job and record the outcome for all of
/// its pages.
fn write_back(doc: &mut Document, job: PageJob, content: Vec<u8>, report: &mut RepairReport) {
    let (before, after) = (job.raw.len(), content.len());
    match replace_content(doc, job.slot, content) {
        Ok(()) => {
            for &page in &job.pages {
                log::debug!("page {page}: content stream rewritten ({before} -> {after} bytes)");
            }
            report.repaired.extend(job.pages);
        }
        Err(e) => {
            let message = e.to_string();
            for page in job.pages {
                report.skip(page, SkipReason::WriteBack(message.clone()));
            }
        }
    }
}

// ========== public entry ==========

/// Rewrite every page content stream of `doc` in canonical syntax.
///
/// Pages are independent: a page whose stream cannot be located, decoded or
/// tokenized keeps its original bytes and the remaining pages are still
/// processed. Nothing is written for a page unless its whole stream was
/// canonicalized.
pub fn repair_document<T: Tokenizer + ?Sized>(
    doc: &mut Document,
    options: &RepairOptions,
    tokenizer: &T,
) -> RepairReport {
    let pages = doc.get_pages();
    let mut report = RepairReport { pages: pages.len(), ..RepairReport::default() };

    let mut jobs: Vec<PageJob> = Vec::new();
    let mut by_slot: BTreeMap<ContentSlot, usize> = BTreeMap::new();
    for (&page_no, &page_id) in &pages {
        let (slot, stream) = match locate_content(doc, page_id) {
            Ok(found) => found,
            Err(reason) => {
                report.skip(page_no, reason);
                continue;
            }
        };
        if let Some(&index) = by_slot.get(&slot) {
            // shared content stream, rewrite it once
            jobs[index].pages.push(page_no);
            continue;
        }
        match decode_stream(stream) {
            Ok(raw) => {
                by_slot.insert(slot, jobs.len());
                jobs.push(PageJob { slot, pages: vec![page_no], raw });
            }
            Err(reason) => report.skip(page_no, reason),
        }
    }

    let results: Vec<std::result::Result<Vec<u8>, TokenizeError>> = if options.parallel {
        jobs.par_iter()
            .map(|job| canonicalize_content(tokenizer, &job.raw))
            .collect()
    } else {
        jobs.iter()
            .map(|job| canonicalize_content(tokenizer, &job.raw))
            .collect()
    };

    for (job, result) in jobs.into_iter().zip(results) {
        match result {
            Ok(content) => write_back(doc, job, content, &mut report),
            Err(e) => {
                for page in job.pages {
                    report.skip(page, SkipReason::Tokenize(e.clone()));
                }
            }
        }
    }

    report.repaired.sort_unstable();
    report.skipped.sort_by_key(|(page, _)| *page);
    report
}

/// Load `input`, repair every page and write the result to `output`.
///
/// The output file is only created once the repaired document has been fully
/// serialized.
pub fn repair_file(input: impl AsRef<Path>, output: impl AsRef<Path>, options: &RepairOptions) -> Result<RepairReport> {
    let (input, output) = (input.as_ref(), output.as_ref());

    let mut doc = Document::load(input).map_err(|source| Error::Load { path: input.to_path_buf(), source })?;
    let report = repair_document(&mut doc, options, &ContentTokenizer);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| Error::Save {
        path: output.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(output, bytes).map_err(|source| Error::Write { path: output.to_path_buf(), source })?;

    log::info!(
        "{}: {} of {} pages repaired, {} skipped",
        input.display(),
        report.repaired.len(),
        report.pages,
        report.skipped.len()
    );
    Ok(report)
}
