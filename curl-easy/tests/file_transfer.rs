//! End-to-end transfers over file:// URLs, exercising perform and the
//! receive sinks without touching the network.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use curl_easy::{Easy, Error, GlobalInit};
use serial_test::serial;
use tempfile::TempDir;

const BODY: &[u8] = b"hello from libcurl\nsecond line\n";

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn setup() -> GlobalInit {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    GlobalInit::new().unwrap()
}

fn source_file(dir: &TempDir, name: &str, content: &[u8]) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    file_url(&path)
}

struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "sink refused the bytes"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
#[serial]
fn recv_returns_the_whole_body() {
    let _global = setup();
    let dir = TempDir::new().unwrap();
    let url = source_file(&dir, "body.txt", BODY);

    let mut easy = Easy::new().unwrap();
    easy.url(&url).unwrap();
    assert_eq!(easy.recv().unwrap(), BODY);
}

#[test]
#[serial]
fn recv_into_buffer_appends() {
    let _global = setup();
    let dir = TempDir::new().unwrap();
    let url = source_file(&dir, "body.txt", BODY);

    let mut easy = Easy::new().unwrap();
    easy.url(&url).unwrap();

    let mut buffer = b"prefix:".to_vec();
    easy.recv_into_buffer(&mut buffer).unwrap();
    assert_eq!(&buffer[..7], b"prefix:");
    assert_eq!(&buffer[7..], BODY);
}

#[test]
#[serial]
fn recv_into_file_writes_the_body() {
    let _global = setup();
    let dir = TempDir::new().unwrap();
    let url = source_file(&dir, "body.txt", BODY);
    let out_path = dir.path().join("out.bin");

    let mut easy = Easy::new().unwrap();
    easy.url(&url).unwrap();

    let mut out = File::create(&out_path).unwrap();
    easy.recv_into_file(&mut out).unwrap();
    drop(out);

    let mut copied = Vec::new();
    File::open(&out_path)
        .unwrap()
        .read_to_end(&mut copied)
        .unwrap();
    assert_eq!(copied, BODY);
}

#[test]
#[serial]
fn sink_errors_abort_the_transfer() {
    let _global = setup();
    let dir = TempDir::new().unwrap();
    let url = source_file(&dir, "body.txt", BODY);

    let mut easy = Easy::new().unwrap();
    easy.url(&url).unwrap();

    let err = easy.recv_into_writer(&mut FailingSink).unwrap_err();
    match err {
        Error::Sink(io_err) => assert_eq!(io_err.to_string(), "sink refused the bytes"),
        other => panic!("expected a sink error, got {other}"),
    }

    // the handle stays usable; the stale callback was cleared
    assert_eq!(easy.recv().unwrap(), BODY);
}

#[test]
#[serial]
#[should_panic(expected = "sink panicked on purpose")]
fn sink_panics_resume_after_the_ffi_boundary() {
    struct PanickingSink;

    impl Write for PanickingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            panic!("sink panicked on purpose");
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let _global = setup();
    let dir = TempDir::new().unwrap();
    let url = source_file(&dir, "body.txt", BODY);

    let mut easy = Easy::new().unwrap();
    easy.url(&url).unwrap();
    let _ = easy.recv_into_writer(&mut PanickingSink);
}

#[test]
#[serial]
fn reset_allows_reuse_for_a_new_transfer() {
    let _global = setup();
    let dir = TempDir::new().unwrap();
    let first = source_file(&dir, "first.txt", b"first body");
    let second = source_file(&dir, "second.txt", b"second body");

    let mut easy = Easy::new().unwrap();
    easy.url(&first).unwrap();
    assert_eq!(easy.recv().unwrap(), b"first body");

    easy.reset();
    easy.url(&second).unwrap();
    assert_eq!(easy.recv().unwrap(), b"second body");
}

#[test]
#[serial]
fn duplicate_carries_the_configuration() {
    let _global = setup();
    let dir = TempDir::new().unwrap();
    let url = source_file(&dir, "body.txt", BODY);

    let mut original = Easy::new().unwrap();
    original.url(&url).unwrap();

    let mut copy = original.duplicate().unwrap();
    assert_eq!(copy.recv().unwrap(), BODY);
    assert_eq!(original.recv().unwrap(), BODY);
}
