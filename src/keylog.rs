use std::io::Write;
use std::sync::Mutex;

/// Receives NSS key-log lines ("SSLKEYLOGFILE" format) so external tools
/// like Wireshark can decrypt captured traffic.
pub trait KeyLog: Send + Sync {
    fn log(&self, label: &str, client_random: &[u8], secret: &[u8]);
}

/// Writes key-log lines to any writer, one line per secret.
pub struct KeyLogWriter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl KeyLogWriter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl KeyLog for KeyLogWriter {
    fn log(&self, label: &str, client_random: &[u8], secret: &[u8]) {
        let line = format!(
            "{} {} {}\n",
            label,
            hex::encode(client_random),
            hex::encode(secret)
        );
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(line.as_bytes());
            let _ = out.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_nss_format_lines() {
        let buf = Arc::new(Mutex::new(vec![]));
        let log = KeyLogWriter::new(Box::new(SharedBuf(buf.clone())));

        log.log("CLIENT_TRAFFIC_SECRET_0", &[0xAB, 0xCD], &[0x01, 0x02]);

        let written = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "CLIENT_TRAFFIC_SECRET_0 abcd 0102\n");
    }
}
