use std::collections::HashSet;
use std::io;
use std::net::TcpListener;

const MAX_ATTEMPTS: usize = 16;

/// Asks the OS for a free loopback port that no running container holds
pub fn allocate_port(in_use: &HashSet<u16>) -> io::Result<u16> {
    for _ in 0..MAX_ATTEMPTS {
        let port = TcpListener::bind(("127.0.0.1", 0))?.local_addr()?.port();
        if !in_use.contains(&port) {
            return Ok(port);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AddrInUse,
        format!("no free port after {} attempts", MAX_ATTEMPTS),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_nonzero_port() {
        let port = allocate_port(&HashSet::new()).unwrap();
        assert_ne!(port, 0);
    }

    #[test]
    fn test_skips_ports_in_use() {
        let first = allocate_port(&HashSet::new()).unwrap();
        let in_use: HashSet<u16> = [first].into_iter().collect();
        let second = allocate_port(&in_use).unwrap();
        assert_ne!(first, second);
    }
}
