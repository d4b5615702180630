use embedded_io::{BufRead, Read, Seek, SeekFrom};
use stream_io::BufReader;
use stream_mocked::MemStream;

fn pattern(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 251) as u8).collect()
}

#[test]
fn small_reads_share_one_refill() {
    let backing = MemStream::with_contents(&pattern(16));
    let handle = backing.clone();
    let mut reader = BufReader::with_capacity(8, backing);

    let mut buf = [0u8; 3];
    reader.read(&mut buf).expect("Should read");
    assert_eq!(&buf, &pattern(16)[..3]);

    reader.read(&mut buf).expect("Should read");
    assert_eq!(&buf, &pattern(16)[3..6]);

    assert_eq!(handle.read_calls(), 1, "both reads come from one refill");
}

#[test]
fn buffer_sized_read_bypasses_the_buffer() {
    let backing = MemStream::with_contents(&pattern(16));
    let handle = backing.clone();
    let mut reader = BufReader::with_capacity(8, backing);

    let mut buf = [0u8; 8];
    let n = reader.read(&mut buf).expect("Should read");
    assert_eq!(n, 8);
    assert_eq!(handle.read_sizes(), vec![8], "one direct underlying read");
}

#[test]
fn seek_compensates_for_read_ahead() {
    let backing = MemStream::with_contents(&pattern(16));
    let mut reader = BufReader::with_capacity(8, backing);

    let mut buf = [0u8; 4];
    reader.read(&mut buf).expect("Should read");

    // The refill moved the underlying cursor to 8; logically we are at 4.
    let pos = reader.seek(SeekFrom::Current(0)).expect("Should seek");
    assert_eq!(pos, 4);

    let mut one = [0u8; 1];
    reader.read(&mut one).expect("Should read");
    assert_eq!(one[0], pattern(16)[4]);
}

#[test]
fn seek_relative_inside_window_needs_no_syscall() {
    let backing = MemStream::with_contents(&pattern(16));
    let handle = backing.clone();
    let mut reader = BufReader::with_capacity(8, backing);

    let mut buf = [0u8; 4];
    reader.read(&mut buf).expect("Should read");

    let seeks = handle.seek_calls();
    reader.seek_relative(2).expect("Should seek");
    assert_eq!(handle.seek_calls(), seeks, "window seek must stay in memory");

    let mut one = [0u8; 1];
    reader.read(&mut one).expect("Should read");
    assert_eq!(one[0], pattern(16)[6]);
}

#[test]
fn seek_relative_outside_window_is_one_syscall() {
    let backing = MemStream::with_contents(&pattern(16));
    let handle = backing.clone();
    let mut reader = BufReader::with_capacity(8, backing);

    let mut buf = [0u8; 4];
    reader.read(&mut buf).expect("Should read");

    let seeks = handle.seek_calls();
    reader.seek_relative(10).expect("Should seek");
    assert_eq!(handle.seek_calls(), seeks + 1, "exactly one real seek");

    let mut one = [0u8; 1];
    reader.read(&mut one).expect("Should read");
    assert_eq!(one[0], pattern(16)[14]);
}

#[test]
fn fill_buf_and_consume() {
    let backing = MemStream::with_contents(b"hello world");
    let mut reader = BufReader::with_capacity(16, backing);

    let window = reader.fill_buf().expect("Should fill");
    assert_eq!(window, b"hello world");

    reader.consume(6);
    let window = reader.fill_buf().expect("Should serve the rest");
    assert_eq!(window, b"world");
}

#[test]
fn eof_repeats_quietly() {
    let backing = MemStream::with_contents(b"ab");
    let mut reader = BufReader::with_capacity(8, backing);

    let mut buf = [0u8; 4];
    let n = reader.read(&mut buf).expect("Should read");
    assert_eq!(&buf[..n], b"ab");

    for _ in 0..3 {
        assert_eq!(reader.read(&mut buf).expect("EOF must not error"), 0);
    }
}

#[test]
fn resize_is_rejected_while_a_window_is_open() {
    let backing = MemStream::with_contents(b"abcdef");
    let mut reader = BufReader::with_capacity(8, backing);

    let mut buf = [0u8; 2];
    reader.read(&mut buf).expect("Should read");
    reader.set_buffer_size(64);
    assert_eq!(reader.buffer_size(), 8, "an open window blocks the resize");

    let mut rest = [0u8; 4];
    reader.read(&mut rest).expect("Should drain the window");
    reader.set_buffer_size(64);
    assert_eq!(reader.buffer_size(), 64);
}

#[test]
fn underlying_errors_pass_through() {
    let backing = MemStream::with_contents(b"data");
    let handle = backing.clone();
    let mut reader = BufReader::with_capacity(8, backing);

    handle.fail_next_read(embedded_io::ErrorKind::BrokenPipe);
    let mut buf = [0u8; 2];
    let err = reader.read(&mut buf).expect_err("Should fail");
    assert_eq!(err, embedded_io::ErrorKind::BrokenPipe);
}
