//! Embedded JPEG previews in RAW files

use image::{DynamicImage, ImageFormat};

const SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];
const MIN_PREVIEW_BYTES: usize = 10_000;
const MAX_CANDIDATES: usize = 8;

/// Decode the largest JPEG stream embedded in `data`
///
/// Candidates are the spans between start-of-image markers, tried from the
/// largest down; the decoder stops at its own end marker so trailing bytes
/// are harmless.
pub fn largest_preview(data: &[u8]) -> Option<DynamicImage> {
    let starts: Vec<usize> = data
        .windows(SOI.len())
        .enumerate()
        .filter(|(_, w)| *w == SOI)
        .map(|(i, _)| i)
        .collect();

    let mut spans: Vec<(usize, usize)> = starts
        .iter()
        .enumerate()
        .map(|(idx, &start)| {
            let end = starts.get(idx + 1).copied().unwrap_or(data.len());
            (start, end)
        })
        .filter(|(start, end)| end - start >= MIN_PREVIEW_BYTES)
        .collect();
    spans.sort_by_key(|(start, end)| std::cmp::Reverse(end - start));

    spans
        .into_iter()
        .take(MAX_CANDIDATES)
        .find_map(|(start, _)| image::load_from_memory_with_format(&data[start..], ImageFormat::Jpeg).ok())
}
