// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Thomas Junier

// A record for sequences: an identifier (first word of the header), the rest of the header as a
// free-text description, and the raw sequence. Format-agnostic, though only FastA is read and
// written at the moment.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub id: String,
    pub description: String,
    pub sequence: String,
}

impl SeqRecord {
    pub fn new(id: &str, description: &str, sequence: &str) -> Self {
        SeqRecord {
            id: id.to_string(),
            description: description.to_string(),
            sequence: sequence.to_string(),
        }
    }

    /// Splits a header line (without the leading '>') into id and description.
    pub fn from_header(header: &str, sequence: String) -> Self {
        let header = header.trim();
        let (id, description) = match header.split_once(char::is_whitespace) {
            Some((id, rest)) => (id, rest.trim()),
            None => (header, ""),
        };
        SeqRecord {
            id: id.to_string(),
            description: description.to_string(),
            sequence,
        }
    }

    pub fn header(&self) -> String {
        if self.description.is_empty() {
            self.id.clone()
        } else {
            format!("{} {}", self.id, self.description)
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}
