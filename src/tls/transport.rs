//! Plaintext transports
//!
//! A [`Transport`] is the socket the HTTP layer opened before asking for a
//! TLS upgrade. [`Carrier`] is what the TLS stream ends up running over:
//! either that transport, or a socket the provider opened itself.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

/// Plaintext byte stream that can be upgraded to TLS
pub trait Transport: Read + Write {
    /// Address of the connected peer
    fn peer_addr(&self) -> io::Result<SocketAddr>;

    /// Close the connection in both directions
    fn close(&mut self) -> io::Result<()>;

    /// Current read/write timeout
    fn io_timeout(&self) -> io::Result<Option<Duration>> {
        Ok(None)
    }

    /// Set the read/write timeout
    fn set_io_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for TcpStream {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }

    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }

    fn io_timeout(&self) -> io::Result<Option<Duration>> {
        self.read_timeout()
    }

    fn set_io_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
}

/// Stream underneath an OpenSSL session
#[derive(Debug)]
pub enum Carrier<T> {
    /// The caller's transport, upgraded in place
    Upgraded {
        transport: T,
        /// Whether closing the TLS session also closes the transport
        auto_close: bool,
    },
    /// A socket opened by the provider
    Direct(TcpStream),
}

impl<T: Transport> Carrier<T> {
    /// The caller's transport, if the session runs over it
    pub fn transport(&self) -> Option<&T> {
        match self {
            Carrier::Upgraded { transport, .. } => Some(transport),
            Carrier::Direct(_) => None,
        }
    }

    /// Whether the session runs over the caller's transport
    pub fn is_upgraded(&self) -> bool {
        matches!(self, Carrier::Upgraded { .. })
    }
}

impl<T: Read> Read for Carrier<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Carrier::Upgraded { transport, .. } => transport.read(buf),
            Carrier::Direct(stream) => stream.read(buf),
        }
    }
}

impl<T: Write> Write for Carrier<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Carrier::Upgraded { transport, .. } => transport.write(buf),
            Carrier::Direct(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Carrier::Upgraded { transport, .. } => transport.flush(),
            Carrier::Direct(stream) => stream.flush(),
        }
    }
}

impl<T: Transport> Transport for Carrier<T> {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Carrier::Upgraded { transport, .. } => transport.peer_addr(),
            Carrier::Direct(stream) => stream.peer_addr(),
        }
    }

    /// Leaves the caller's transport open unless it was handed over with
    /// `auto_close`.
    fn close(&mut self) -> io::Result<()> {
        match self {
            Carrier::Upgraded {
                transport,
                auto_close: true,
            } => transport.close(),
            Carrier::Upgraded {
                auto_close: false, ..
            } => Ok(()),
            Carrier::Direct(stream) => stream.shutdown(Shutdown::Both),
        }
    }

    fn io_timeout(&self) -> io::Result<Option<Duration>> {
        match self {
            Carrier::Upgraded { transport, .. } => transport.io_timeout(),
            Carrier::Direct(stream) => stream.read_timeout(),
        }
    }

    fn set_io_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Carrier::Upgraded { transport, .. } => transport.set_io_timeout(timeout),
            Carrier::Direct(stream) => Transport::set_io_timeout(stream, timeout),
        }
    }
}
