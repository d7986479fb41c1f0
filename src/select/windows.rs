//! Windows multi-handle wait, per spec §4.6/§5. There is no single Win32
//! call that waits across a mix of console/pipe handles and sockets the way
//! `poll(2)` does, so this races a `PeekNamedPipe`-ticking thread against a
//! `WSAPoll` wait over the socket handles, joined through an
//! `mpsc::channel`.

use std::os::windows::io::{AsRawHandle, AsRawSocket};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use windows_sys::Win32::Networking::WinSock::{WSAPoll, POLLRDNORM, SOCKET, WSAPOLLFD};
use windows_sys::Win32::Storage::FileSystem::PeekNamedPipe;

use crate::errno::unwrap_os_error;
use crate::file::File;
use crate::Errno;

/// Ticks `PeekNamedPipe`-style readiness on a single socket, by way of
/// `WSAPoll`. Used by [`crate::net`] to back a lone `TcpListenerFile`'s or
/// `TcpConnFile`'s own `poll` implementation.
pub(crate) fn wsa_poll_readable<S: AsRawSocket>(sock: &S, timeout_ms: i64) -> Result<bool, Errno> {
    let mut fds = [WSAPOLLFD {
        fd: sock.as_raw_socket() as SOCKET,
        events: POLLRDNORM,
        revents: 0,
    }];
    let timeout = if timeout_ms < 0 {
        -1
    } else {
        timeout_ms.min(i32::MAX as i64) as i32
    };
    let n = unsafe { WSAPoll(fds.as_mut_ptr(), 1, timeout) };
    if n < 0 {
        Err(unwrap_os_error(&std::io::Error::last_os_error()))
    } else {
        Ok(n > 0)
    }
}

pub(crate) fn select_readable(files: &mut [&mut File], timeout_ms: i64) -> Result<Vec<usize>, Errno> {
    let mut always_ready = Vec::new();
    let mut pipe_idx = Vec::new();
    let mut socket_idx = Vec::new();
    for (i, f) in files.iter().enumerate() {
        match f {
            File::Dir(_) | File::ReadOnly(_) | File::CompositeRoot(_) => always_ready.push(i),
            File::Stdio(s) => {
                if s.stdin_handle().is_some() {
                    pipe_idx.push(i);
                } else {
                    always_ready.push(i);
                }
            }
            File::TcpListener(_) | File::TcpConn(_) => socket_idx.push(i),
        }
    }
    if !always_ready.is_empty() {
        return Ok(always_ready);
    }
    if pipe_idx.is_empty() && socket_idx.is_empty() {
        return Ok(Vec::new());
    }

    let deadline = if timeout_ms < 0 {
        None
    } else {
        Some(Instant::now() + Duration::from_millis(timeout_ms as u64))
    };

    let (tx, rx) = mpsc::channel::<usize>();
    let raw_stdin = pipe_idx.first().and_then(|&i| match &files[i] {
        File::Stdio(s) => s.stdin_handle().map(|h| h.as_raw_handle() as isize),
        _ => None,
    });
    let pipe_thread = if let Some(raw) = raw_stdin {
        Some({
            let tx = tx.clone();
            let idx = pipe_idx[0];
            std::thread::spawn(move || {
                loop {
                    let mut available: u32 = 0;
                    let ok = unsafe {
                        PeekNamedPipe(
                            raw as _,
                            std::ptr::null_mut(),
                            0,
                            std::ptr::null_mut(),
                            &mut available,
                            std::ptr::null_mut(),
                        )
                    };
                    if ok != 0 && available > 0 {
                        let _ = tx.send(idx);
                        return;
                    }
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            return;
                        }
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            })
        })
    } else {
        None
    };

    // Poll the sockets in short slices so we keep checking the pipe-thread's
    // channel rather than blocking the whole timeout inside one WSAPoll call.
    let mut wsa_fds: Vec<WSAPOLLFD> = socket_idx
        .iter()
        .map(|&i| WSAPOLLFD {
            fd: raw_socket_of(&files[i]) as SOCKET,
            events: POLLRDNORM,
            revents: 0,
        })
        .collect();

    let slice_ms = 25i32;
    loop {
        if let Ok(idx) = rx.try_recv() {
            return Ok(vec![idx]);
        }
        if !wsa_fds.is_empty() {
            for fd in wsa_fds.iter_mut() {
                fd.revents = 0;
            }
            let n = unsafe { WSAPoll(wsa_fds.as_mut_ptr(), wsa_fds.len() as u32, slice_ms) };
            if n < 0 {
                return Err(unwrap_os_error(&std::io::Error::last_os_error()));
            }
            if n > 0 {
                let ready: Vec<usize> = wsa_fds
                    .iter()
                    .zip(socket_idx.iter())
                    .filter(|(fd, _)| fd.revents & POLLRDNORM != 0)
                    .map(|(_, &i)| i)
                    .collect();
                if !ready.is_empty() {
                    return Ok(ready);
                }
            }
        } else {
            std::thread::sleep(Duration::from_millis(slice_ms as u64));
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }
    }
    let _ = pipe_thread;
    Ok(Vec::new())
}

fn raw_socket_of(file: &File) -> SOCKET {
    match file {
        File::TcpListener(l) => l.listener_ref().as_raw_socket() as SOCKET,
        File::TcpConn(c) => c.stream_ref().as_raw_socket() as SOCKET,
        _ => unreachable!("raw_socket_of called on a non-socket handle"),
    }
}
