use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
};

use clap::Parser;
use qos_core::io::SocketAddress;

use crate::{run, KeySyncHostConfig};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(long)]
    cid: Option<u32>,
    #[arg(long)]
    port: Option<u32>,
    #[arg(long)]
    usock: Option<String>,

    #[arg(long)]
    host_ip: String,
    #[arg(long)]
    host_port: u16,

    #[arg(long, default_value_t = false)]
    vsock_to_host: bool,
}

impl Args {
    fn host_addr(&self) -> SocketAddr {
        let ip = Ipv4Addr::from_str(&self.host_ip).expect("could not parse ip to IP v4");
        SocketAddr::new(IpAddr::V4(ip), self.host_port)
    }

    /// # Panics
    ///
    /// Panics if the options are not valid for exactly one of unix or vsock.
    fn enclave_addr(&self) -> SocketAddress {
        match (self.cid, self.port, &self.usock) {
            #[cfg(feature = "vsock")]
            (Some(c), Some(p), None) => SocketAddress::new_vsock(c, p, self.vsock_to_host_flag()),
            (None, None, Some(u)) => SocketAddress::new_unix(u),
            _ => panic!("invalid socket options: specify exactly one of --usock or --cid+--port"),
        }
    }

    #[cfg(feature = "vsock")]
    fn vsock_to_host_flag(&self) -> u8 {
        if self.vsock_to_host {
            qos_core::io::VMADDR_FLAG_TO_HOST
        } else {
            qos_core::io::VMADDR_NO_FLAGS
        }
    }
}

/// Host server command line interface.
pub struct CLI;
impl CLI {
    /// Execute the command line interface.
    pub async fn execute() {
        tracing_subscriber::fmt::init();
        let args = Args::parse();

        run(KeySyncHostConfig {
            listen_addr: args.host_addr(),
            enclave_addr: args.enclave_addr(),
        })
        .await
        .unwrap();
    }
}
