pub mod echo_codec;
pub use echo_codec::{build_echo_request, parse_reply, Reply, PACKET_SIZE, PAYLOAD_SIZE};

mod sequence_number;
pub use sequence_number::SequenceNumber;

pub mod socket;
pub use socket::raw_socket::RawSocket;
pub use socket::Socket;
