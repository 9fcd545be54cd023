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

//! Streaming result collector.
//!
//! Bridges the transport's asynchronous result callbacks to a pull-based
//! record sequence. The producer side ([`CollectorSink`]) runs in the
//! transport's context and never blocks; the consumer side
//! ([`RecordStream`]) suspends only inside [`RecordStream::next`].

use crate::error::{Error, RemoteError, Result};
use crate::record::{ChunkReader, ObjectDecoder, PairDecoder, RecordDecoder};
use bytes::Bytes;
use log::warn;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Lazily decoded `(key, value)` sequence from a partitioned retrieval.
pub type EntryStream = RecordStream<PairDecoder>;

/// Lazily decoded result-object sequence from a query execution.
pub type ObjectStream = RecordStream<ObjectDecoder>;

enum StreamEvent {
    Chunk(Bytes),
    End,
    Failed(RemoteError),
}

/// Creates a connected sink/stream pair for one execution.
pub fn streaming_collector<D: RecordDecoder>(decoder: D) -> (Arc<CollectorSink>, RecordStream<D>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = Arc::new(CollectorSink {
        tx,
        ended: AtomicBool::new(false),
    });
    let stream = RecordStream {
        rx,
        decoder,
        current: None,
        done: false,
    };
    (sink, stream)
}

/// Producer endpoint handed to the transport for one execution.
///
/// Events are forwarded FIFO into an unbounded channel, so `add_result`
/// never blocks the transport's callback context. Once a terminal signal
/// has been accepted, every later signal is dropped: a collector that has
/// ended never emits further records.
pub struct CollectorSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
    ended: AtomicBool,
}

impl crate::rpc::ResultSink for CollectorSink {
    fn add_result(&self, chunk: Bytes) {
        if self.ended.load(Ordering::Acquire) {
            warn!("Dropping result chunk received after end-of-stream");
            return;
        }
        // A send error only means the consumer abandoned the stream.
        let _ = self.tx.send(StreamEvent::Chunk(chunk));
    }

    fn end_results(&self, error: Option<RemoteError>) {
        if self.ended.swap(true, Ordering::AcqRel) {
            warn!("Ignoring duplicate end-of-stream signal");
            return;
        }
        let event = match error {
            Some(error) => StreamEvent::Failed(error),
            None => StreamEvent::End,
        };
        let _ = self.tx.send(event);
    }
}

/// Consumer endpoint: a finite, single-pass, non-restartable sequence of
/// typed records.
///
/// Records arrive in the order the transport produced them. A carried
/// remote error surfaces only after every record queued before it has
/// been pulled; a malformed chunk surfaces at the bad record. After the
/// first terminal item (`None` or an `Err`) the stream yields `None`
/// forever.
pub struct RecordStream<D: RecordDecoder> {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    decoder: D,
    current: Option<ChunkReader>,
    done: bool,
}

impl<D: RecordDecoder> RecordStream<D> {
    /// Pulls the next record, suspending until one arrives or the stream
    /// terminates. This is the only blocking point exposed to callers.
    pub async fn next(&mut self) -> Option<Result<D::Record>> {
        if self.done {
            return None;
        }
        loop {
            if let Some(reader) = self.current.as_mut() {
                match self.decoder.decode(reader) {
                    Ok(Some(record)) => return Some(Ok(record)),
                    Ok(None) => self.current = None,
                    Err(e) => {
                        self.terminate();
                        return Some(Err(e));
                    }
                }
            }

            match self.rx.recv().await {
                Some(StreamEvent::Chunk(chunk)) => match ChunkReader::new(chunk) {
                    Ok(reader) => self.current = Some(reader),
                    Err(e) => {
                        self.terminate();
                        return Some(Err(e));
                    }
                },
                Some(StreamEvent::End) => {
                    self.terminate();
                    return None;
                }
                Some(StreamEvent::Failed(error)) => {
                    self.terminate();
                    return Some(Err(Error::StreamRemote { source: error }));
                }
                // Producer dropped without a terminal signal; the
                // transport broke its contract.
                None => {
                    self.terminate();
                    return Some(Err(Error::UnexpectedError {
                        message: "Result stream dropped without end-of-stream signal".to_string(),
                        source: None,
                    }));
                }
            }
        }
    }

    /// Drains the remaining records, failing on the first error.
    pub async fn try_collect(mut self) -> Result<Vec<D::Record>> {
        let mut records = Vec::new();
        while let Some(item) = self.next().await {
            records.push(item?);
        }
        Ok(records)
    }

    fn terminate(&mut self) {
        self.done = true;
        self.current = None;
        self.rx.close();
    }
}
