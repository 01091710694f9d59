//! Game messages nested inside reliable and unreliable datagrams.
//!
//! After the datagram header (tag + nonce for reliable, tag only for
//! unreliable) a datagram carries zero or more messages, each framed as
//! `length (u16 LE) | tag (u8) | payload[length]`.
//!
//! Only the game search exchange is decoded. The search request is a fixed
//! 50-byte reliable datagram; the response layout was reconstructed from
//! packet captures and its unexplained bytes are written exactly as observed.

use crate::ack::{encode_reliable, Nonce};
use crate::buffer::{concat, concat_all, hex, read_u16_le, require_len};
use crate::error::{ProtocolError, Result};
use crate::game_code::GameCode;
use crate::wire::WireType;
use bitflags::bitflags;
use log::{debug, info, warn};
use std::fmt;

pub const MESSAGE_HEADER_LEN: usize = 3;

pub const TAG_SEARCH_GAMES: u8 = 0x10;

pub const SEARCH_REQUEST_LEN: usize = 50;
const SEARCH_LANGUAGE_OFFSET: usize = 10;
const SEARCH_MAPS_OFFSET: usize = 14;
const SEARCH_IMPOSTERS_OFFSET: usize = 38;

/// Captured search request, used as the base when building one.
const SEARCH_REQUEST_TEMPLATE: [u8; SEARCH_REQUEST_LEN] = [
    0x03, 0x00, 0x02, 0x2c, 0x00, 0x10, 0x00, 0x2a, 0x02, 0x0a, 0x00, 0x01, 0x00, 0x00, 0x01, 0x00,
    0x00, 0x80, 0x3f, 0x00, 0x00, 0x80, 0x3f, 0x00, 0x00, 0xc0, 0x3f, 0x00, 0x00, 0x70, 0x41, 0x01,
    0x01, 0x02, 0x01, 0x00, 0x00, 0x00, 0x02, 0x01, 0x0f, 0x00, 0x00, 0x00, 0x78, 0x00, 0x00, 0x00,
    0x01, 0x0f,
];

const RESPONSE_MARKER: [u8; 2] = [0x01, 0x00];
const RESPONSE_SUB_MARKER: [u8; 2] = [0x00, 0x10];
const LISTING_MARKER: [u8; 2] = [0x07, 0x56];
const RESPONSE_HEADER_LEN: usize = 9;
const LISTING_PREFIX_LEN: usize = 6;

/// Longest name whose listing still fits the single-byte length fields.
pub const MAX_LISTING_NAME_LEN: usize = 240;

/// One nested message borrowed from a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage<'a> {
    pub tag: u8,
    pub payload: &'a [u8],
}

/// Iterates the nested messages of a datagram body.
///
/// A message whose declared length runs past the end of the body yields an
/// error and ends iteration.
pub struct MessageReader<'a> {
    body: &'a [u8],
    failed: bool,
}

impl<'a> MessageReader<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self { body, failed: false }
    }
}

impl<'a> Iterator for MessageReader<'a> {
    type Item = Result<RawMessage<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.body.is_empty() {
            return None;
        }

        if self.body.len() < MESSAGE_HEADER_LEN {
            self.failed = true;
            return Some(Err(ProtocolError::TooShort {
                needed: MESSAGE_HEADER_LEN,
                actual: self.body.len(),
            }));
        }

        let declared = read_u16_le(self.body, 0).unwrap_or_default() as usize;
        let tag = self.body[2];
        let rest = &self.body[MESSAGE_HEADER_LEN..];
        if rest.len() < declared {
            self.failed = true;
            return Some(Err(ProtocolError::Truncated {
                declared,
                available: rest.len(),
            }));
        }

        let (payload, remaining) = rest.split_at(declared);
        self.body = remaining;
        Some(Ok(RawMessage { tag, payload }))
    }
}

pub fn encode_message(tag: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let len = u16::try_from(payload.len()).map_err(|_| ProtocolError::FieldTooLong {
        len: payload.len(),
        max: u16::MAX as usize,
    })?;
    let header = len.to_le_bytes();
    Ok(concat_all(&[&header, &[tag], payload]))
}

bitflags! {
    /// Maps a search asks for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapSet: u8 {
        const SKELD = 0x01;
        const MIRA_HQ = 0x02;
        const POLUS = 0x04;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImposterCount {
    Any,
    Exactly(u8),
}

impl From<u8> for ImposterCount {
    fn from(raw: u8) -> Self {
        match raw {
            0 => ImposterCount::Any,
            n => ImposterCount::Exactly(n),
        }
    }
}

impl ImposterCount {
    pub fn raw(self) -> u8 {
        match self {
            ImposterCount::Any => 0,
            ImposterCount::Exactly(n) => n,
        }
    }
}

impl fmt::Display for ImposterCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImposterCount::Any => f.write_str("any"),
            ImposterCount::Exactly(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    All,
    Other,
    Spanish,
    Korean,
    Russian,
    Portuguese,
    Arabic,
    Filipino,
    Polish,
    English,
}

impl Language {
    pub fn code(self) -> u16 {
        match self {
            Language::All => 0,
            Language::Other => 1,
            Language::Spanish => 2,
            Language::Korean => 4,
            Language::Russian => 8,
            Language::Portuguese => 16,
            Language::Arabic => 32,
            Language::Filipino => 64,
            Language::Polish => 128,
            Language::English => 256,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        let language = match code {
            0 => Language::All,
            1 => Language::Other,
            2 => Language::Spanish,
            4 => Language::Korean,
            8 => Language::Russian,
            16 => Language::Portuguese,
            32 => Language::Arabic,
            64 => Language::Filipino,
            128 => Language::Polish,
            256 => Language::English,
            _ => return None,
        };
        Some(language)
    }
}

/// Language code exactly as sent; not every value has a known name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageCode(pub u16);

impl LanguageCode {
    pub fn language(self) -> Option<Language> {
        Language::from_code(self.0)
    }
}

impl From<Language> for LanguageCode {
    fn from(language: Language) -> Self {
        LanguageCode(language.code())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.language() {
            Some(language) => write!(f, "{:?}", language),
            None => write!(f, "unknown ({:#06x})", self.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCriteria {
    pub imposters: ImposterCount,
    pub maps: MapSet,
    pub language: LanguageCode,
}

impl SearchCriteria {
    /// Decodes a whole search request datagram, which must be exactly 50 bytes.
    pub fn decode(datagram: &[u8]) -> Result<Self> {
        if datagram.len() != SEARCH_REQUEST_LEN {
            return Err(ProtocolError::LengthMismatch {
                expected: SEARCH_REQUEST_LEN,
                actual: datagram.len(),
            });
        }

        Ok(SearchCriteria {
            imposters: ImposterCount::from(datagram[SEARCH_IMPOSTERS_OFFSET]),
            maps: MapSet::from_bits_retain(datagram[SEARCH_MAPS_OFFSET]),
            language: LanguageCode(
                read_u16_le(datagram, SEARCH_LANGUAGE_OFFSET).unwrap_or_default(),
            ),
        })
    }

    /// Builds a reliable search request datagram carrying these criteria.
    pub fn encode_request(&self, nonce: Nonce) -> Vec<u8> {
        let mut out = SEARCH_REQUEST_TEMPLATE;
        out[1..3].copy_from_slice(&nonce.bytes());
        out[SEARCH_LANGUAGE_OFFSET..SEARCH_LANGUAGE_OFFSET + 2]
            .copy_from_slice(&self.language.0.to_le_bytes());
        out[SEARCH_MAPS_OFFSET] = self.maps.bits();
        out[SEARCH_IMPOSTERS_OFFSET] = self.imposters.raw();
        out.to_vec()
    }
}

/// One lobby advertised in a search response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameListing {
    pub game_id: GameCode,
    pub name: String,
    pub imposters: u8,
    /// Counters following the imposter count; their exact meaning is unconfirmed.
    pub occupancy: [u8; 3],
}

/// Encodes a search response advertising one listing.
pub fn encode_search_response(listing: &GameListing) -> Result<Vec<u8>> {
    let name = listing.name.as_bytes();
    if name.len() > MAX_LISTING_NAME_LEN {
        return Err(ProtocolError::FieldTooLong {
            len: name.len(),
            max: MAX_LISTING_NAME_LEN,
        });
    }

    let name_field = concat(&[name.len() as u8], name);
    let counters = concat(&[listing.imposters], &listing.occupancy);
    let body = concat(&listing.game_id.bytes(), &concat(&name_field, &counters));

    let prefix = [
        (3 + body.len()) as u8,
        0x00,
        0x00,
        0x00,
        LISTING_MARKER[0],
        LISTING_MARKER[1],
    ];
    let message = concat(&prefix, &body);

    Ok(concat(&response_header(message.len() as u8), &message))
}

/// Search response with no listings.
pub fn encode_empty_search_response() -> Vec<u8> {
    response_header(0).to_vec()
}

/// Reads back a search response, `None` when it advertises no game.
pub fn decode_search_response(datagram: &[u8]) -> Result<Option<GameListing>> {
    require_len(datagram, RESPONSE_HEADER_LEN)?;
    if datagram[..2] != RESPONSE_MARKER || datagram[4..6] != RESPONSE_SUB_MARKER {
        return Err(ProtocolError::UnexpectedTag(datagram[0]));
    }

    let declared = datagram[6] as usize;
    if declared == 0 {
        return Ok(None);
    }
    let message = &datagram[RESPONSE_HEADER_LEN..];
    if message.len() != declared {
        return Err(ProtocolError::LengthMismatch {
            expected: declared,
            actual: message.len(),
        });
    }

    require_len(message, LISTING_PREFIX_LEN + 5)?;
    if message[4..6] != LISTING_MARKER {
        return Err(ProtocolError::UnexpectedTag(message[4]));
    }

    let body = &message[LISTING_PREFIX_LEN..];
    let game_id = GameCode::from_bytes([body[0], body[1], body[2], body[3]]);
    let name_len = body[4] as usize;
    require_len(body, 5 + name_len + 4)?;

    let name = std::str::from_utf8(&body[5..5 + name_len])
        .map_err(|_| ProtocolError::InvalidUtf8)?
        .to_string();
    let counters = &body[5 + name_len..];

    Ok(Some(GameListing {
        game_id,
        name,
        imposters: counters[0],
        occupancy: [counters[1], counters[2], counters[3]],
    }))
}

fn response_header(total_len: u8) -> [u8; RESPONSE_HEADER_LEN] {
    [
        RESPONSE_MARKER[0],
        RESPONSE_MARKER[1],
        0x00,
        0x00,
        RESPONSE_SUB_MARKER[0],
        RESPONSE_SUB_MARKER[1],
        total_len,
        0x00,
        0x00,
    ]
}

/// Where search responses get their listings from.
pub trait ListingSource: Send + Sync {
    fn find_game(&self, criteria: &SearchCriteria) -> Option<GameListing>;
}

/// Decodes the nested messages of a reliable or unreliable datagram and builds
/// the reply, empty when there is nothing to answer or the input is malformed.
pub fn handle_payload(datagram: &[u8], source: &dyn ListingSource) -> Vec<u8> {
    let kind = WireType::of(datagram);
    let Some(header_len) = kind.header_len() else {
        return Vec::new();
    };
    let Some(body) = datagram.get(header_len..) else {
        debug!("{} datagram shorter than its header", kind);
        return Vec::new();
    };

    for message in MessageReader::new(body) {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                debug!("Malformed {} payload: {}", kind, e);
                return Vec::new();
            }
        };

        match (message.tag, kind) {
            (TAG_SEARCH_GAMES, WireType::Reliable) => return search_reply(datagram, source),
            (tag, _) => debug!(
                "Unhandled {} message {:#04x}: {}",
                kind,
                tag,
                hex(message.payload)
            ),
        }
    }

    Vec::new()
}

fn search_reply(datagram: &[u8], source: &dyn ListingSource) -> Vec<u8> {
    let criteria = match SearchCriteria::decode(datagram) {
        Ok(criteria) => criteria,
        Err(e) => {
            debug!("Ignoring search request: {}", e);
            return Vec::new();
        }
    };

    info!(
        "Search request: imposters {}, maps {:?}, language {}",
        criteria.imposters, criteria.maps, criteria.language
    );

    match source.find_game(&criteria) {
        Some(listing) => match encode_search_response(&listing) {
            Ok(reply) => {
                debug!("Answering search with {} ({})", listing.game_id, listing.name);
                reply
            }
            Err(e) => {
                warn!("Cannot encode listing {}: {}", listing.game_id, e);
                Vec::new()
            }
        },
        None => encode_empty_search_response(),
    }
}

/// Wraps nested messages in a reliable datagram.
pub fn encode_reliable_messages(nonce: Nonce, messages: &[&[u8]]) -> Vec<u8> {
    encode_reliable(nonce, &concat_all(messages))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<GameListing>);

    impl ListingSource for Fixed {
        fn find_game(&self, _criteria: &SearchCriteria) -> Option<GameListing> {
            self.0.clone()
        }
    }

    fn fake_game() -> GameListing {
        GameListing {
            game_id: GameCode::from_bytes([0xf9, 0x51, 0x13, 0x80]),
            name: "Fake Game".to_string(),
            imposters: 3,
            occupancy: [0x01, 0x02, 0x08],
        }
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            imposters: ImposterCount::Any,
            maps: MapSet::SKELD | MapSet::POLUS,
            language: Language::English.into(),
        }
    }

    #[test]
    fn test_search_request_decode_from_capture() {
        let decoded = SearchCriteria::decode(&SEARCH_REQUEST_TEMPLATE).unwrap();
        assert_eq!(decoded.imposters, ImposterCount::Exactly(2));
        assert_eq!(decoded.maps, MapSet::SKELD);
        assert_eq!(decoded.language.language(), Some(Language::English));
    }

    #[test]
    fn test_search_request_zero_imposters_means_any() {
        let mut datagram = SEARCH_REQUEST_TEMPLATE;
        datagram[SEARCH_IMPOSTERS_OFFSET] = 0;
        let decoded = SearchCriteria::decode(&datagram).unwrap();
        assert_eq!(decoded.imposters, ImposterCount::Any);
        assert_eq!(decoded.imposters.to_string(), "any");
    }

    #[test]
    fn test_search_request_rejects_wrong_length() {
        for len in [0, 1, 49, 51, 256] {
            let datagram = vec![0u8; len];
            assert_eq!(
                SearchCriteria::decode(&datagram),
                Err(ProtocolError::LengthMismatch {
                    expected: SEARCH_REQUEST_LEN,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn test_encode_request_places_fields() {
        let request = criteria().encode_request(Nonce::from_value(0x0102));
        assert_eq!(request.len(), SEARCH_REQUEST_LEN);
        assert_eq!(&request[..3], &[0x03, 0x02, 0x01]);
        assert_eq!(&request[10..12], &[0x00, 0x01]);
        assert_eq!(request[14], 0x05);
        assert_eq!(request[38], 0x00);
        assert_eq!(SearchCriteria::decode(&request).unwrap(), criteria());
    }

    #[test]
    fn test_search_response_matches_capture() {
        let expected = [
            0x01, 0x00, 0x00, 0x00, 0x00, 0x10, 0x18, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x07,
            0x56, 0xf9, 0x51, 0x13, 0x80, 0x09, b'F', b'a', b'k', b'e', b' ', b'G', b'a', b'm',
            b'e', 0x03, 0x01, 0x02, 0x08,
        ];
        assert_eq!(encode_search_response(&fake_game()).unwrap(), expected);
    }

    #[test]
    fn test_search_response_lengths_track_name() {
        for name in ["", "a", "shy pink", "é"] {
            let listing = GameListing {
                name: name.to_string(),
                ..fake_game()
            };
            let reply = encode_search_response(&listing).unwrap();
            let n = name.len();
            assert_eq!(reply.len(), 9 + 6 + 4 + 1 + n + 4);
            assert_eq!(reply[6] as usize, 6 + 4 + 1 + n + 4);
            assert_eq!(reply[9] as usize, 3 + 4 + 1 + n + 4);
            assert_eq!(reply[19] as usize, n);
        }
    }

    #[test]
    fn test_search_response_name_limit() {
        let ok = GameListing {
            name: "n".repeat(MAX_LISTING_NAME_LEN),
            ..fake_game()
        };
        let reply = encode_search_response(&ok).unwrap();
        assert_eq!(reply[6], 0xff);

        let too_long = GameListing {
            name: "n".repeat(MAX_LISTING_NAME_LEN + 1),
            ..fake_game()
        };
        assert!(matches!(
            encode_search_response(&too_long),
            Err(ProtocolError::FieldTooLong { .. })
        ));
    }

    #[test]
    fn test_empty_search_response() {
        assert_eq!(
            encode_empty_search_response(),
            vec![0x01, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_decode_search_response() {
        let reply = encode_search_response(&fake_game()).unwrap();
        assert_eq!(decode_search_response(&reply).unwrap(), Some(fake_game()));
        assert_eq!(
            decode_search_response(&encode_empty_search_response()).unwrap(),
            None
        );

        assert!(matches!(
            decode_search_response(&reply[..reply.len() - 1]),
            Err(ProtocolError::LengthMismatch { .. })
        ));
        assert!(matches!(
            decode_search_response(&[0x02, 0x05, 0x00]),
            Err(ProtocolError::TooShort { .. })
        ));
    }

    #[test]
    fn test_message_reader() {
        let first = encode_message(0x10, &[1, 2, 3]).unwrap();
        let second = encode_message(0x05, &[]).unwrap();
        let body = concat(&first, &second);

        let messages: Vec<_> = MessageReader::new(&body).collect::<Result<_>>().unwrap();
        assert_eq!(
            messages,
            vec![
                RawMessage {
                    tag: 0x10,
                    payload: &[1, 2, 3]
                },
                RawMessage {
                    tag: 0x05,
                    payload: &[]
                },
            ]
        );
    }

    #[test]
    fn test_message_reader_truncated() {
        let mut reader = MessageReader::new(&[0x05, 0x00, 0x10, 0x01]);
        assert_eq!(
            reader.next(),
            Some(Err(ProtocolError::Truncated {
                declared: 5,
                available: 1
            }))
        );
        assert_eq!(reader.next(), None);

        let mut short = MessageReader::new(&[0x01]);
        assert!(matches!(short.next(), Some(Err(ProtocolError::TooShort { .. }))));
        assert_eq!(short.next(), None);
    }

    #[test]
    fn test_handle_payload_search() {
        let request = criteria().encode_request(Nonce::from_value(7));
        let reply = handle_payload(&request, &Fixed(Some(fake_game())));
        assert_eq!(&reply[..2], &[0x01, 0x00]);
        assert_eq!(reply, encode_search_response(&fake_game()).unwrap());

        let none = handle_payload(&request, &Fixed(None));
        assert_eq!(none, encode_empty_search_response());
    }

    #[test]
    fn test_handle_payload_truncated_search() {
        let request = criteria().encode_request(Nonce::from_value(7));
        assert!(handle_payload(&request[..49], &Fixed(Some(fake_game()))).is_empty());
    }

    #[test]
    fn test_handle_payload_ignores_unreliable_search() {
        let message = encode_message(TAG_SEARCH_GAMES, &[0u8; 44]).unwrap();
        let datagram = concat(&[0x04], &message);
        assert!(handle_payload(&datagram, &Fixed(Some(fake_game()))).is_empty());
    }

    #[test]
    fn test_handle_payload_edge_cases() {
        let source = Fixed(Some(fake_game()));
        assert!(handle_payload(&[], &source).is_empty());
        assert!(handle_payload(&[0x04], &source).is_empty());
        assert!(handle_payload(&[0x03, 0x01], &source).is_empty());
        assert!(handle_payload(&[0x03, 0x01, 0x00], &source).is_empty());
        assert!(handle_payload(&[0x02, 0x01, 0x00], &source).is_empty());

        let other = encode_message(0x08, &[1, 2]).unwrap();
        let datagram = encode_reliable_messages(Nonce::from_value(1), &[&other]);
        assert!(handle_payload(&datagram, &source).is_empty());
    }

    #[test]
    fn test_language_codes() {
        for code in [0u16, 1, 2, 4, 8, 16, 32, 64, 128, 256] {
            let language = Language::from_code(code).unwrap();
            assert_eq!(language.code(), code);
        }
        assert_eq!(Language::from_code(3), None);
        assert_eq!(LanguageCode(3).to_string(), "unknown (0x0003)");
        assert_eq!(LanguageCode(256).to_string(), "English");
    }

    #[test]
    fn test_map_set_keeps_unknown_bits() {
        let maps = MapSet::from_bits_retain(0x0b);
        assert!(maps.contains(MapSet::SKELD | MapSet::MIRA_HQ));
        assert!(!maps.contains(MapSet::POLUS));
        assert_eq!(maps.bits(), 0x0b);
    }
}
