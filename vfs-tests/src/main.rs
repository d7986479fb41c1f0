//! Manual smoke-test binary for exercising `sandbox-vfs` backends against a
//! real directory, outside of the `cargo test` harness.

use sandbox_vfs::{DirFS, Oflag, FS};

fn main() {
    env_logger_init();
    let dir = tempfile::tempdir().expect("tempdir");
    let fs = FS::Dir(DirFS::new(dir.path()).expect("open root"));
    let mut file = fs
        .open_file("smoke.txt", Oflag::CREAT | Oflag::RDWR, 0o600)
        .expect("open");
    file.write(b"hello").expect("write");
    file.close().expect("close");
    println!("{}", fs.string());
}

fn env_logger_init() {
    let _ = log::set_max_level(log::LevelFilter::Info);
}
