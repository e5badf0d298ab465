//! Server configuration with the defaults the binary starts from.

/// Default host the listener binds to.
pub const HOST: &str = "localhost";

/// Default port the listener binds to.
pub const PORT: u16 = 3333;

#[derive(Debug, Clone)]
pub struct Config {
    /// Host name or address to bind.
    pub host: String,

    /// TCP port to bind.
    pub port: u16,

    /// Initial capacity of each connection's read buffer, in bytes.
    pub read_buffer_capacity: usize,

    /// Largest request a connection will buffer before it is dropped, in bytes.
    pub max_request_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: HOST.to_string(),
            port: PORT,
            read_buffer_capacity: 4 * 1024,
            max_request_size: 512 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_request_size(mut self, size: usize) -> Self {
        self.max_request_size = size;
        self
    }

    /// `host:port`, as passed to the listener.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
