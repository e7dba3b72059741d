/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::sync::Mutex;

use crate::record::MetricRecord;
use crate::scope::MetricsConsumer;

const DEFAULT_CACHE_SIZE: usize = 4096;

struct LineBuf<W> {
    cache_size: usize,
    buf: Vec<u8>,
    io: W,
}

impl<W: Write> LineBuf<W> {
    fn emit(&mut self, line: &[u8]) -> io::Result<()> {
        if self.buf.is_empty() {
            self.buf.extend_from_slice(line);
        } else if self.buf.len() + 1 + line.len() > self.cache_size {
            self.flush_buf()?;
            self.buf.extend_from_slice(line);
        } else {
            self.buf.push(b'\n');
            self.buf.extend_from_slice(line);
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.flush_buf()
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        self.buf.push(b'\n');
        self.io.write_all(&self.buf)?;
        self.buf.clear();
        Ok(())
    }
}

/// Consumer writing delivered metrics as statsd lines.
///
/// Lines are batched up to `cache_size` bytes before being written out as a
/// single newline separated chunk. Call [`LineSink::flush`] to write out the
/// tail.
pub struct LineSink<W> {
    inner: Mutex<LineBuf<W>>,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(io: W) -> Self {
        LineSink::with_capacity(io, DEFAULT_CACHE_SIZE)
    }

    pub fn with_capacity(io: W, cache_size: usize) -> Self {
        LineSink {
            inner: Mutex::new(LineBuf {
                cache_size,
                buf: Vec::with_capacity(cache_size),
                io,
            }),
        }
    }

    pub fn flush(&self) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.flush()?;
        inner.io.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner().unwrap().io
    }
}

impl<W: Write + Send> MetricsConsumer for LineSink<W> {
    fn consume(&self, record: &MetricRecord) -> anyhow::Result<()> {
        let line = record.to_string();
        self.inner.lock().unwrap().emit(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::{FlushInterval, ScopeConfig};
    use crate::scope::StatsScope;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("broken pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn scope(prefix: &str) -> StatsScope {
        StatsScope::new(ScopeConfig::with_prefix(prefix).flush_interval(FlushInterval::Disabled))
    }

    #[test]
    fn batch_lines() {
        let scope = scope("test");
        let sink = Arc::new(LineSink::with_capacity(Vec::new(), 64));
        scope.add_consumer(sink.clone());

        scope.count("count", 20).unwrap();
        scope
            .gauge_with_options(
                "gauge",
                1.5,
                &crate::MetricOptions::default().with_tag("t", "v"),
            )
            .unwrap();
        scope.flush().unwrap();
        sink.flush().unwrap();
        drop(scope);

        let sink = Arc::into_inner(sink).unwrap();
        assert_eq!(
            sink.into_inner().as_slice(),
            b"test.count:20|c\ntest.gauge:1.5|g|#t:v\n"
        );
    }

    #[test]
    fn overflow_writes_batch() {
        let sink = LineSink::with_capacity(Vec::new(), 16);
        let scope = scope("test");
        scope.count("count", 20).unwrap();
        scope.count("count", 30).unwrap();
        for r in scope.buffered() {
            sink.consume(&r).unwrap();
        }
        // first line written when the second no longer fits
        {
            let inner = sink.inner.lock().unwrap();
            assert_eq!(inner.io.as_slice(), b"test.count:20|c\n");
            assert_eq!(inner.buf.as_slice(), b"test.count:30|c");
        }
        sink.flush().unwrap();
        assert_eq!(
            sink.into_inner().as_slice(),
            b"test.count:20|c\ntest.count:30|c\n"
        );
    }

    #[test]
    fn write_error_fails_flush() {
        let scope = scope("test");
        scope.add_consumer(Arc::new(LineSink::with_capacity(FailingWriter, 8)));
        scope.count("a", 1).unwrap();
        scope.count("b", 1).unwrap();
        assert!(scope.flush().is_err());
    }
}
