// src/policy.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Single-shot vs multipart decision and part layout.
//!
//! Splitting is caller-driven: an explicit multipart request is always
//! honoured (even for a zero-length payload) and a plain request is never
//! split, whatever its size.

/// How a put will be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPlan {
    SingleShot,
    Multipart { part_size: usize, part_count: usize },
}

/// Pick the upload path for `content_length` bytes.
pub fn choose(content_length: u64, multipart_requested: bool, part_size: usize) -> TransferPlan {
    if !multipart_requested {
        return TransferPlan::SingleShot;
    }
    TransferPlan::Multipart {
        part_size,
        part_count: part_count(content_length, part_size),
    }
}

/// `ceil(len / part_size)`, but never less than one: an empty payload is
/// still sent as a single empty part.
pub fn part_count(content_length: u64, part_size: usize) -> usize {
    let p = part_size.max(1) as u64;
    content_length.div_ceil(p).max(1) as usize
}

/// One part of a multipart upload, as it will be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    /// 1-based, contiguous.
    pub part_number: i32,
    pub offset: u64,
    pub length: u64,
    pub is_last: bool,
}

/// Iterator over the parts of a payload, in upload order.
///
/// Each step takes `min(part_size, remaining)` bytes; the part is flagged last
/// once `remaining <= part_size`. The offset always advances by the full part
/// size, which only matters on the final step, where iteration stops anyway.
#[derive(Debug, Clone)]
pub struct PartLayout {
    part_size: u64,
    remaining: u64,
    offset: u64,
    next_part_number: i32,
    done: bool,
}

impl PartLayout {
    pub fn new(content_length: u64, part_size: usize) -> Self {
        Self {
            part_size: part_size.max(1) as u64,
            remaining: content_length,
            offset: 0,
            next_part_number: 1,
            done: false,
        }
    }
}

impl Iterator for PartLayout {
    type Item = PartSpec;

    fn next(&mut self) -> Option<PartSpec> {
        if self.done {
            return None;
        }
        let is_last = self.remaining <= self.part_size;
        let part = PartSpec {
            part_number: self.next_part_number,
            offset: self.offset,
            length: self.remaining.min(self.part_size),
            is_last,
        };

        if is_last {
            self.done = true;
        } else {
            self.remaining -= self.part_size;
            self.offset += self.part_size;
            self.next_part_number += 1;
        }
        Some(part)
    }
}
