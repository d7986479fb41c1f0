use std::net::{SocketAddr, TcpStream};

use sandbox_vfs::{CompositeFS, DirFS, FileType, Oflag, Pflag, ReadFS, SeekWhence, FS};

fn dirfs(path: &std::path::Path) -> FS {
    FS::Dir(DirFS::new(path).unwrap())
}

#[test]
fn mkdir_readdir_rmdir_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let fs = dirfs(tmp.path());

    fs.mkdir("d", 0o700).unwrap();
    let mut dir = fs.open_file("d", Oflag::RDONLY | Oflag::DIRECTORY, 0).unwrap();
    let mut listing = dir.readdir().unwrap();
    assert_eq!(listing.next(), Err(sandbox_vfs::Errno::ENOENT));
    dir.close().unwrap();

    fs.rmdir("d").unwrap();
    assert_eq!(fs.stat("d"), Err(sandbox_vfs::Errno::ENOENT));
}

#[test]
fn write_pread_truncate() {
    let tmp = tempfile::tempdir().unwrap();
    let fs = dirfs(tmp.path());

    let mut file = fs
        .open_file("f", Oflag::CREAT | Oflag::RDWR, 0o600)
        .unwrap();
    file.write(b"hello").unwrap();

    let mut buf = [0u8; 5];
    assert_eq!(file.pread(&mut buf, 0).unwrap(), 5);
    assert_eq!(&buf, b"hello");

    file.close().unwrap();

    fs.truncate("f", 3).unwrap();
    assert_eq!(fs.stat("f").unwrap().size, 3);
}

#[test]
fn composite_mount_write_goes_through() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    let composite = FS::Composite(
        CompositeFS::new(vec![
            ("/".to_string(), dirfs(a.path())),
            ("/tmp".to_string(), dirfs(b.path())),
        ])
        .unwrap(),
    );

    let mut file = composite
        .open_file("/tmp/x", Oflag::CREAT | Oflag::RDWR, 0o600)
        .unwrap();
    file.write(b"y").unwrap();
    file.close().unwrap();

    let b_fs = dirfs(b.path());
    assert_eq!(b_fs.stat("x").unwrap().size, 1);
}

#[test]
fn composite_root_listing_includes_sub_mount_names() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    std::fs::write(a.path().join("own.txt"), b"x").unwrap();

    let composite = FS::Composite(
        CompositeFS::new(vec![
            ("/".to_string(), dirfs(a.path())),
            ("/tmp".to_string(), dirfs(b.path())),
        ])
        .unwrap(),
    );

    let mut root = composite
        .open_file("/", Oflag::RDONLY | Oflag::DIRECTORY, 0)
        .unwrap();
    let mut names = Vec::new();
    let mut listing = root.readdir().unwrap();
    loop {
        match listing.next() {
            Ok(d) => names.push(d.name),
            Err(sandbox_vfs::Errno::ENOENT) => break,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    assert!(names.contains(&"tmp".to_string()));
    assert!(names.contains(&"own.txt".to_string()));
}

#[cfg(unix)]
#[test]
fn symlink_lstat_readlink() {
    let tmp = tempfile::tempdir().unwrap();
    let fs = dirfs(tmp.path());

    fs.symlink("target", "link").unwrap();
    let st = fs.lstat("link").unwrap();
    assert_eq!(st.mode.file_type, FileType::Symlink);
    assert_eq!(fs.readlink("link").unwrap(), std::path::PathBuf::from("target"));
}

#[test]
fn readfs_rejects_writes_but_allows_reads() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("existing"), b"data").unwrap();

    let ro = FS::Read(ReadFS::new(dirfs(tmp.path())));
    assert_eq!(ro.mkdir("x", 0o755), Err(sandbox_vfs::Errno::EROFS));

    let mut file = ro.open_file("existing", Oflag::RDONLY, 0).unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf).unwrap(), 4);
    assert_eq!(&buf, b"data");
}

#[test]
fn nonblocking_socket_read_eagain_then_poll_then_read() {
    use std::io::Write as _;

    let mut server =
        sandbox_vfs::File::tcp_listener("127.0.0.1:0".parse::<SocketAddr>().unwrap()).unwrap();
    let addr = server.local_addr().unwrap();

    let mut client = TcpStream::connect(addr).unwrap();
    let mut accepted = server.accept().unwrap();
    accepted.set_nonblock(true).unwrap();

    let mut buf = [0u8; 8];
    assert_eq!(accepted.read(&mut buf), Err(sandbox_vfs::Errno::EAGAIN));

    client.write_all(b"abc").unwrap();

    assert!(accepted.poll(Pflag::POLLIN, 1_000).unwrap());
    let mut buf = [0u8; 5];
    let n = accepted.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"abc");
}

#[test]
fn directory_seek_rewinds_iteration() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a"), b"").unwrap();
    let fs = dirfs(tmp.path());

    let mut dir = fs.open_file("", Oflag::RDONLY | Oflag::DIRECTORY, 0).unwrap();
    let first_count = drain(&mut dir);
    dir.seek(0, SeekWhence::Start).unwrap();
    let second_count = drain(&mut dir);
    assert_eq!(first_count, second_count);
}

fn drain(file: &mut sandbox_vfs::File) -> usize {
    let mut n = 0;
    let mut listing = file.readdir().unwrap();
    loop {
        match listing.next() {
            Ok(_) => n += 1,
            Err(sandbox_vfs::Errno::ENOENT) => break,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    n
}
