use crossbeam_channel::Receiver;
use std::io::{self, BufWriter, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// One queued message. Arrival order is the channel order.
#[derive(Debug)]
pub(crate) struct LogLine {
    stamp_ms: Option<u128>,
    text: String,
}

impl LogLine {
    #[inline]
    pub(crate) fn new(text: String, timestamps: bool) -> Self {
        let stamp_ms = timestamps.then(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis()
        });
        Self { stamp_ms, text }
    }

    #[inline]
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.stamp_ms {
            Some(ms) => writeln!(out, "[{}] {}", ms, self.text),
            None => writeln!(out, "{}", self.text),
        }
    }
}

/// Writer task body.
///
/// Blocks on the queue, appends every line in arrival order and flushes each
/// time the queue runs dry. Returns once every sender is gone and the backlog
/// is fully written.
pub(crate) fn drain_loop<W: Write>(rx: Receiver<LogLine>, sink: W) -> io::Result<u64> {
    let mut out = BufWriter::new(sink);
    let mut written = 0u64;

    while let Ok(line) = rx.recv() {
        line.write_to(&mut out)?;
        written += 1;

        // Batch whatever is already queued before paying for a flush.
        while let Ok(line) = rx.try_recv() {
            line.write_to(&mut out)?;
            written += 1;
        }

        out.flush()?;
    }

    out.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn plain_lines_in_order() {
        let (tx, rx) = unbounded();
        tx.send(LogLine::new("a".into(), false)).unwrap();
        tx.send(LogLine::new("b".into(), false)).unwrap();
        drop(tx);

        let mut buf = Vec::new();
        let n = drain_loop(rx, &mut buf).unwrap();

        assert_eq!(n, 2);
        assert_eq!(String::from_utf8(buf).unwrap(), "a\nb\n");
    }

    #[test]
    fn stamped_lines_carry_millis_prefix() {
        let (tx, rx) = unbounded();
        tx.send(LogLine::new("hello".into(), true)).unwrap();
        drop(tx);

        let mut buf = Vec::new();
        drain_loop(rx, &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();

        assert!(s.starts_with('['));
        assert!(s.ends_with("] hello\n"));
        let stamp = &s[1..s.find(']').unwrap()];
        assert!(stamp.parse::<u128>().is_ok());
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn sink_failure_surfaces_as_error() {
        let (tx, rx) = unbounded();
        tx.send(LogLine::new("x".into(), false)).unwrap();
        drop(tx);

        assert!(drain_loop(rx, Broken).is_err());
    }
}
