use std::io::{self, Read, Write};
use std::time::Duration;

/// A byte stream to a reader device that can be waited on for readability.
///
/// [`SerialLink`](crate::SerialLink) is the production implementation. On
/// Unix, `UnixStream` also implements it so exchanges can be driven over a
/// socket pair in tests and loopback tooling.
pub trait LinkIo: Read + Write {
    /// Wait up to `timeout` for the link to have data (or a hangup) pending.
    ///
    /// Returns `Ok(false)` when the timeout expires.
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool>;
}

impl<T: LinkIo + ?Sized> LinkIo for &mut T {
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).poll_readable(timeout)
    }
}

impl<T: LinkIo + ?Sized> LinkIo for Box<T> {
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).poll_readable(timeout)
    }
}

#[cfg(unix)]
impl LinkIo for std::os::unix::net::UnixStream {
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        use std::os::fd::AsRawFd;

        poll_fd_readable(self.as_raw_fd(), timeout)
    }
}

/// `poll(2)` a single descriptor for input, retrying on `EINTR`.
///
/// Hangup and error conditions count as readable: the following `read`
/// reports them. A descriptor that is not open fails with `EBADF`.
#[cfg(unix)]
pub(crate) fn poll_fd_readable(fd: std::os::fd::RawFd, timeout: Duration) -> io::Result<bool> {
    let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    loop {
        // SAFETY: `pfd` is a valid pollfd and the count passed is 1.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if pfd.revents & libc::POLLNVAL != 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        return Ok(rc > 0 && pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0);
    }
}
