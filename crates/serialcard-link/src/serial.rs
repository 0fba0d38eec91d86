use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::traits::{poll_fd_readable, LinkIo};

/// A configured serial link to a reader device.
///
/// Opened in raw mode (8-N-1, no flow control, no post-processing) at the
/// configured baud rate. Reads block until at least `min_read` bytes are
/// available. The handle is released when the link is dropped.
#[derive(Debug)]
pub struct SerialLink {
    file: File,
    path: PathBuf,
    config: LinkConfig,
}

impl SerialLink {
    /// Open and configure the serial device at `path`.
    ///
    /// The device is opened without becoming the controlling terminal and
    /// without waiting for carrier detect. Configuration is all-or-nothing:
    /// if any step fails the handle is closed and an error is returned.
    pub fn open(path: impl AsRef<Path>, config: &LinkConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = speed_constant(config.baud_rate)
            .ok_or(LinkError::UnsupportedBaudRate(config.baud_rate))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| LinkError::Open {
                path: path.clone(),
                source: e,
            })?;
        let fd = file.as_raw_fd();

        // SAFETY: `fd` is an open descriptor owned by `file`.
        if unsafe { libc::isatty(fd) } != 1 {
            return Err(LinkError::NotATerminal { path });
        }

        let mut termios = get_attributes(fd).map_err(|e| LinkError::GetAttributes {
            path: path.clone(),
            source: e,
        })?;

        apply_raw_mode(&mut termios, config.min_read);
        set_speed(&mut termios, speed).map_err(|e| LinkError::SetSpeed {
            path: path.clone(),
            baud_rate: config.baud_rate,
            source: e,
        })?;

        // SAFETY: `termios` is fully initialized and `fd` is a terminal.
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &termios) } < 0 {
            return Err(LinkError::SetAttributes {
                path,
                source: io::Error::last_os_error(),
            });
        }

        // O_NONBLOCK only covers the open itself; exchanges rely on VMIN.
        set_blocking(fd)?;

        info!(?path, baud_rate = config.baud_rate, "serial link configured");

        Ok(Self {
            file,
            path,
            config: *config,
        })
    }

    /// The device path this link was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration applied at open time.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl LinkIo for SerialLink {
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        poll_fd_readable(self.file.as_raw_fd(), timeout)
    }
}

impl AsRawFd for SerialLink {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        debug!(path = ?self.path, "closing serial link");
    }
}

fn get_attributes(fd: RawFd) -> io::Result<libc::termios> {
    let mut termios = std::mem::MaybeUninit::<libc::termios>::zeroed();
    // SAFETY: `termios` points to writable storage of the right size.
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: tcgetattr succeeded and filled the struct.
    Ok(unsafe { termios.assume_init() })
}

/// Switch `termios` to raw 8-N-1 with `VMIN = min_read` and `VTIME = 0`.
pub(crate) fn apply_raw_mode(termios: &mut libc::termios, min_read: u8) {
    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::ICRNL
        | libc::INLCR
        | libc::PARMRK
        | libc::INPCK
        | libc::ISTRIP
        | libc::IXON);

    termios.c_oflag &=
        !(libc::OCRNL | libc::ONLCR | libc::ONLRET | libc::ONOCR | libc::OFILL | libc::OPOST);

    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    // VMIN/VTIME only take effect with canonical mode off.
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    termios.c_cc[libc::VMIN] = min_read;
    termios.c_cc[libc::VTIME] = 0;
}

fn set_speed(termios: &mut libc::termios, speed: libc::speed_t) -> io::Result<()> {
    // SAFETY: `termios` is a valid, initialized termios struct.
    let rc = unsafe {
        if libc::cfsetispeed(termios, speed) < 0 {
            -1
        } else {
            libc::cfsetospeed(termios, speed)
        }
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn set_blocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: `fd` is an open descriptor; F_GETFL/F_SETFL take no pointers.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn speed_constant(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        1_200 => libc::B1200,
        2_400 => libc::B2400,
        4_800 => libc::B4800,
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}
