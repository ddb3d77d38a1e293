//! Peer address allocation from a per-interface subnet pool.
//!
//! Allocation is a deterministic sequential scan from a moving hint, so
//! regenerating a configuration from identical prior state always yields
//! the same addresses.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use tracing::debug;

use crate::error::{Result, WgError};

/// A pool of allocatable host addresses within one IPv4 subnet.
///
/// The network and broadcast addresses are never handed out. Allocations
/// persist until released explicitly; releasing an address that was never
/// allocated is a no-op.
#[derive(Clone, Debug)]
pub struct AddressPool {
    subnet: Ipv4Net,
    allocated: HashSet<Ipv4Addr>,
    next_hint: Ipv4Addr,
}

impl AddressPool {
    /// Creates an empty pool over `subnet`.
    #[must_use]
    pub fn new(subnet: Ipv4Net) -> Self {
        let first = u32::from(subnet.network()).saturating_add(1);
        Self {
            subnet,
            allocated: HashSet::new(),
            next_hint: Ipv4Addr::from(first),
        }
    }

    /// Creates an empty pool from CIDR notation.
    ///
    /// # Errors
    ///
    /// Returns an error if the CIDR notation is invalid.
    pub fn from_cidr(s: &str) -> Result<Self> {
        let subnet = s
            .parse::<Ipv4Net>()
            .map_err(|e| WgError::InvalidCidr(format!("{s}: {e}")))?;
        Ok(Self::new(subnet))
    }

    /// Returns the pool's subnet.
    #[must_use]
    pub const fn subnet(&self) -> Ipv4Net {
        self.subnet
    }

    /// Returns whether `addr` is currently allocated.
    #[must_use]
    pub fn is_allocated(&self, addr: Ipv4Addr) -> bool {
        self.allocated.contains(&addr)
    }

    /// Returns the number of allocated addresses.
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.allocated.len()
    }

    /// Allocates an address.
    ///
    /// With `requested`, that exact address is claimed if it is a usable
    /// host in the subnet and free. Without, the first free address at or
    /// after the hint is claimed, wrapping at the subnet end. The hint then
    /// moves past the claimed address.
    ///
    /// # Errors
    ///
    /// - [`WgError::AddressOutOfRange`] if `requested` is outside the
    ///   subnet or is the network/broadcast address.
    /// - [`WgError::AddressConflict`] if `requested` is already allocated.
    /// - [`WgError::PoolExhausted`] if no free address remains.
    pub fn allocate(&mut self, requested: Option<Ipv4Addr>) -> Result<Ipv4Addr> {
        let Some(range) = HostRange::of(self.subnet) else {
            return Err(WgError::PoolExhausted(self.subnet));
        };

        let addr = match requested {
            Some(addr) => {
                if !range.covers(addr) {
                    return Err(WgError::AddressOutOfRange {
                        addr,
                        subnet: self.subnet,
                    });
                }
                if self.allocated.contains(&addr) {
                    return Err(WgError::AddressConflict(addr));
                }
                addr
            }
            None => self.scan(range)?,
        };

        self.allocated.insert(addr);
        self.next_hint = range.successor(addr);
        debug!(addr = %addr, subnet = %self.subnet, "allocated address");
        Ok(addr)
    }

    /// Marks `addr` as allocated if it is a usable host of the subnet and
    /// not already taken, moving the hint past it. Used to rebuild pool
    /// state from an existing configuration; addresses outside the subnet
    /// are ignored rather than rejected.
    ///
    /// Returns whether the address was reserved.
    pub fn reserve(&mut self, addr: Ipv4Addr) -> bool {
        let Some(range) = HostRange::of(self.subnet) else {
            return false;
        };
        if !range.covers(addr) || !self.allocated.insert(addr) {
            return false;
        }
        self.next_hint = range.successor(addr);
        true
    }

    /// Releases `addr` back to the pool. Idempotent: releasing an address
    /// that is not allocated is a no-op.
    pub fn release(&mut self, addr: Ipv4Addr) {
        if self.allocated.remove(&addr) {
            debug!(addr = %addr, subnet = %self.subnet, "released address");
        }
    }

    fn scan(&self, range: HostRange) -> Result<Ipv4Addr> {
        let start = range.clamp(self.next_hint);
        let mut candidate = start;
        loop {
            if !self.allocated.contains(&candidate) {
                return Ok(candidate);
            }
            candidate = range.successor(candidate);
            if candidate == start {
                return Err(WgError::PoolExhausted(self.subnet));
            }
        }
    }
}

/// The usable host addresses of a subnet, as an inclusive u32 range.
#[derive(Clone, Copy)]
struct HostRange {
    first: u32,
    last: u32,
}

impl HostRange {
    /// Returns the host range of `subnet`, or `None` for /31 and /32
    /// subnets, which have no usable hosts under this allocation policy.
    fn of(subnet: Ipv4Net) -> Option<Self> {
        let network = u32::from(subnet.network());
        let broadcast = u32::from(subnet.broadcast());
        if broadcast.saturating_sub(network) < 2 {
            return None;
        }
        Some(Self {
            first: network + 1,
            last: broadcast - 1,
        })
    }

    fn covers(self, addr: Ipv4Addr) -> bool {
        (self.first..=self.last).contains(&u32::from(addr))
    }

    fn clamp(self, addr: Ipv4Addr) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(addr).clamp(self.first, self.last))
    }

    /// The next host after `addr`, wrapping from the last back to the first.
    fn successor(self, addr: Ipv4Addr) -> Ipv4Addr {
        let n = u32::from(addr);
        if n >= self.last {
            Ipv4Addr::from(self.first)
        } else {
            Ipv4Addr::from(n + 1)
        }
    }
}
