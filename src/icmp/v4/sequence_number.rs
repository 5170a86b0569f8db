type SequenceNumberInnerType = u16;

/// ICMP echo sequence number. Wraps at 16 bits.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct SequenceNumber(pub SequenceNumberInnerType);

impl SequenceNumber {
    // Half the sequence space; serial arithmetic as in RFC 1982.
    const HALF_RANGE: SequenceNumberInnerType = 1 << 15;

    /// Sequence number carried by the `count`-th request of a session.
    #[allow(clippy::cast_possible_truncation)] // sequence numbers wrap
    pub fn for_request(count: u32) -> Self {
        SequenceNumber(count as SequenceNumberInnerType)
    }

    /// True if `self` was sent no later than `highest`, allowing for wraparound.
    pub fn is_not_after(self, highest: SequenceNumber) -> bool {
        highest.0.wrapping_sub(self.0) < Self::HALF_RANGE
    }

    /// True if a session that has sent `packets_sent` requests sent `self`.
    ///
    /// Before the counter wraps that is exactly `1..=packets_sent`. Once it
    /// has wrapped every value was used, and only the half of the space
    /// leading up to the latest request is accepted.
    pub fn was_sent(self, packets_sent: u32) -> bool {
        match SequenceNumberInnerType::try_from(packets_sent) {
            Ok(highest) => (Self::start_value()..=highest).contains(&self.0),
            Err(_) => self.is_not_after(Self::for_request(packets_sent)),
        }
    }

    fn start_value() -> SequenceNumberInnerType {
        // ICMPv4 sequence numbers start from 1.
        1
    }
}

impl From<SequenceNumber> for SequenceNumberInnerType {
    fn from(value: SequenceNumber) -> Self {
        value.0
    }
}

impl From<SequenceNumberInnerType> for SequenceNumber {
    fn from(value: SequenceNumberInnerType) -> Self {
        SequenceNumber(value)
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
