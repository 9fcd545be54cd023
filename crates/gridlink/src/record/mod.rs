// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Result chunk framing.
//!
//! A remote execution delivers its results as binary chunks, each holding
//! a count-prefixed run of fixed-shape tuples:
//! - EntryCount => Int32 (big-endian, non-negative)
//! - per entry: FieldCount => Int8, then FieldCount fields
//! - per field: Length => Int32 (big-endian) followed by Length bytes
//!
//! Retrieval records are 2-field tuples (key, value); query records are
//! 1-field tuples (result object). Tuples are decoded one at a time as the
//! consumer pulls, never eagerly for the whole chunk.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const COUNT_LENGTH: usize = 4;
const FIELD_LEN_LENGTH: usize = 4;

/// Incremental reader over one result chunk.
pub struct ChunkReader {
    buf: Bytes,
    remaining_entries: u32,
}

impl ChunkReader {
    pub fn new(chunk: Bytes) -> Result<ChunkReader> {
        let mut buf = chunk;
        if buf.len() < COUNT_LENGTH {
            return Err(Error::StreamDecode {
                message: format!("Chunk too short for entry count: {} bytes", buf.len()),
            });
        }
        let count = buf.get_i32();
        if count < 0 {
            return Err(Error::StreamDecode {
                message: format!("Negative entry count: {count}"),
            });
        }
        Ok(ChunkReader {
            buf,
            remaining_entries: count as u32,
        })
    }

    /// Decodes the next tuple, verifying it has exactly `expected_fields`
    /// fields. Returns `Ok(None)` once the chunk is exhausted.
    pub fn next_entry(&mut self, expected_fields: usize) -> Result<Option<Vec<Bytes>>> {
        if self.remaining_entries == 0 {
            if self.buf.has_remaining() {
                return Err(Error::StreamDecode {
                    message: format!(
                        "Chunk has {} trailing bytes after final entry",
                        self.buf.remaining()
                    ),
                });
            }
            return Ok(None);
        }

        if !self.buf.has_remaining() {
            return Err(Error::StreamDecode {
                message: format!(
                    "Chunk truncated: {} entries still expected",
                    self.remaining_entries
                ),
            });
        }
        let field_count = self.buf.get_u8() as usize;
        if field_count != expected_fields {
            return Err(Error::StreamDecode {
                message: format!("Expected {expected_fields}-field record, got {field_count}"),
            });
        }

        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            if self.buf.remaining() < FIELD_LEN_LENGTH {
                return Err(Error::StreamDecode {
                    message: "Chunk truncated inside field length".to_string(),
                });
            }
            let len = self.buf.get_i32();
            if len < 0 {
                return Err(Error::StreamDecode {
                    message: format!("Negative field length: {len}"),
                });
            }
            let len = len as usize;
            if self.buf.remaining() < len {
                return Err(Error::StreamDecode {
                    message: format!(
                        "Field length {len} exceeds remaining chunk size {}",
                        self.buf.remaining()
                    ),
                });
            }
            fields.push(self.buf.copy_to_bytes(len));
        }

        self.remaining_entries -= 1;
        Ok(Some(fields))
    }
}

/// Builder for result chunks, used by transports and tests.
#[derive(Default)]
pub struct ChunkBuilder {
    body: BytesMut,
    entries: u32,
}

impl ChunkBuilder {
    pub fn new() -> ChunkBuilder {
        ChunkBuilder::default()
    }

    pub fn push_entry(&mut self, fields: &[&[u8]]) -> &mut Self {
        debug_assert!(fields.len() <= u8::MAX as usize);
        self.body.put_u8(fields.len() as u8);
        for field in fields {
            self.body.put_i32(field.len() as i32);
            self.body.put_slice(field);
        }
        self.entries += 1;
        self
    }

    pub fn push_pair(&mut self, key: &[u8], value: &[u8]) -> &mut Self {
        self.push_entry(&[key, value])
    }

    pub fn push_object(&mut self, object: &[u8]) -> &mut Self {
        self.push_entry(&[object])
    }

    pub fn build(self) -> Bytes {
        let mut chunk = BytesMut::with_capacity(COUNT_LENGTH + self.body.len());
        chunk.put_i32(self.entries as i32);
        chunk.extend_from_slice(&self.body);
        chunk.freeze()
    }
}

/// Maps raw tuples pulled from a [`ChunkReader`] to typed records.
pub trait RecordDecoder: Send + 'static {
    type Record: Send + 'static;

    fn decode(&self, reader: &mut ChunkReader) -> Result<Option<Self::Record>>;
}

/// Decodes 2-field `[key, value]` retrieval records.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairDecoder;

impl RecordDecoder for PairDecoder {
    type Record = (Bytes, Bytes);

    fn decode(&self, reader: &mut ChunkReader) -> Result<Option<Self::Record>> {
        let Some(mut fields) = reader.next_entry(2)? else {
            return Ok(None);
        };
        let value = fields.pop().expect("two fields");
        let key = fields.pop().expect("two fields");
        Ok(Some((key, value)))
    }
}

/// Decodes 1-field `[resultObject]` query records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectDecoder;

impl RecordDecoder for ObjectDecoder {
    type Record = Bytes;

    fn decode(&self, reader: &mut ChunkReader) -> Result<Option<Self::Record>> {
        let Some(mut fields) = reader.next_entry(1)? else {
            return Ok(None);
        };
        Ok(Some(fields.pop().expect("one field")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_chunk(pairs: &[(&[u8], &[u8])]) -> Bytes {
        let mut builder = ChunkBuilder::new();
        for (k, v) in pairs {
            builder.push_pair(k, v);
        }
        builder.build()
    }

    #[test]
    fn pair_chunk_round_trip() {
        let chunk = pair_chunk(&[(b"k1", b"v1"), (b"k2", b"v2")]);
        let mut reader = ChunkReader::new(chunk).unwrap();

        let (k, v) = PairDecoder.decode(&mut reader).unwrap().unwrap();
        assert_eq!((k.as_ref(), v.as_ref()), (b"k1".as_slice(), b"v1".as_slice()));
        let (k, v) = PairDecoder.decode(&mut reader).unwrap().unwrap();
        assert_eq!((k.as_ref(), v.as_ref()), (b"k2".as_slice(), b"v2".as_slice()));
        assert!(PairDecoder.decode(&mut reader).unwrap().is_none());
    }

    #[test]
    fn object_chunk_round_trip() {
        let mut builder = ChunkBuilder::new();
        builder.push_object(b"alpha").push_object(b"");
        let mut reader = ChunkReader::new(builder.build()).unwrap();

        assert_eq!(
            ObjectDecoder.decode(&mut reader).unwrap().unwrap().as_ref(),
            b"alpha"
        );
        assert_eq!(
            ObjectDecoder.decode(&mut reader).unwrap().unwrap().as_ref(),
            b""
        );
        assert!(ObjectDecoder.decode(&mut reader).unwrap().is_none());
    }

    #[test]
    fn empty_chunk_yields_nothing() {
        let mut reader = ChunkReader::new(ChunkBuilder::new().build()).unwrap();
        assert!(PairDecoder.decode(&mut reader).unwrap().is_none());
    }

    #[test]
    fn shape_mismatch_is_decode_error() {
        let mut builder = ChunkBuilder::new();
        builder.push_object(b"only-one-field");
        let mut reader = ChunkReader::new(builder.build()).unwrap();

        let err = PairDecoder.decode(&mut reader).unwrap_err();
        assert!(matches!(err, Error::StreamDecode { .. }));
    }

    #[test]
    fn good_records_decode_before_the_bad_one() {
        // First record is well-formed, second is truncated mid-field.
        let full = pair_chunk(&[(b"k1", b"v1"), (b"k2", b"v2")]);
        let truncated = full.slice(0..full.len() - 1);

        let mut reader = ChunkReader::new(truncated).unwrap();
        assert!(PairDecoder.decode(&mut reader).unwrap().is_some());
        let err = PairDecoder.decode(&mut reader).unwrap_err();
        assert!(matches!(err, Error::StreamDecode { .. }));
    }

    #[test]
    fn short_and_trailing_chunks_rejected() {
        assert!(ChunkReader::new(Bytes::from_static(&[0, 0])).is_err());

        let mut with_trailing = BytesMut::new();
        with_trailing.extend_from_slice(&ChunkBuilder::new().build());
        with_trailing.put_u8(0xFF);
        let mut reader = ChunkReader::new(with_trailing.freeze()).unwrap();
        assert!(PairDecoder.decode(&mut reader).is_err());
    }

    #[test]
    fn negative_counts_rejected() {
        let mut buf = BytesMut::new();
        buf.put_i32(-1);
        assert!(ChunkReader::new(buf.freeze()).is_err());

        let mut buf = BytesMut::new();
        buf.put_i32(1);
        buf.put_u8(1);
        buf.put_i32(-5);
        let mut reader = ChunkReader::new(buf.freeze()).unwrap();
        assert!(ObjectDecoder.decode(&mut reader).is_err());
    }
}
