//! Human-readable summaries of server replies.

use protocol::buffer::hex;
use protocol::wire::TAG_ACKNOWLEDGEMENT;
use protocol::{decode_search_response, Nonce, WireType};

const ACK_LEN: usize = 4;

pub fn describe(reply: &[u8]) -> String {
    if reply.len() == ACK_LEN && reply[0] == TAG_ACKNOWLEDGEMENT {
        let nonce = Nonce::from_bytes([reply[1], reply[2]]);
        return format!("ack for nonce {}", nonce.value());
    }

    // Search responses also start with 0x01, so try them before falling back
    if let Ok(found) = decode_search_response(reply) {
        return match found {
            Some(listing) => format!(
                "game {} \"{}\" with {} imposters, counters {:?}",
                listing.game_id, listing.name, listing.imposters, listing.occupancy
            ),
            None => "no games found".to_string(),
        };
    }

    match WireType::of(reply) {
        WireType::Disconnect if reply.len() > 5 => {
            format!("disconnect, reason {}", reply[reply.len() - 1])
        }
        kind => format!("{} ({} bytes): {}", kind, reply.len(), hex(reply)),
    }
}

/// Parses hex bytes, with or without separating whitespace.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if !digits.is_ascii() {
        return Err(format!("non-hex characters in {:?}", text));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {:?}", text));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte {:?}", &digits[i..i + 2]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{encode_empty_search_response, encode_search_response, GameCode, GameListing};

    #[test]
    fn test_describe_ack() {
        assert_eq!(describe(&[0x01, 0x2a, 0x00, 0xff]), "ack for nonce 42");
    }

    #[test]
    fn test_describe_search_responses() {
        let listing = GameListing {
            game_id: GameCode::from_bytes([0xf9, 0x51, 0x13, 0x80]),
            name: "Fake Game".to_string(),
            imposters: 3,
            occupancy: [1, 2, 8],
        };
        let text = describe(&encode_search_response(&listing).unwrap());
        assert!(text.starts_with("game FCUBWQ \"Fake Game\""));

        assert_eq!(describe(&encode_empty_search_response()), "no games found");
    }

    #[test]
    fn test_describe_disconnect_and_other() {
        assert_eq!(
            describe(&[0x09, 0x01, 0x01, 0x00, 0x00, 0x05]),
            "disconnect, reason 5"
        );
        assert!(describe(&[0x04, 0xab]).ends_with("04 ab"));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("02 05 00").unwrap(), vec![0x02, 0x05, 0x00]);
        assert_eq!(parse_hex("0aFF").unwrap(), vec![0x0a, 0xff]);
        assert!(parse_hex("123").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("aé1").is_err());
    }
}
