//! RDATA parsing behind the type descriptor seam.
//!
//! Every record type is dispatched through a [`Descriptor`]: a parser for
//! the type's representation format and a check for wire-format RDATA
//! obtained through the RFC 3597 generic form. Types without a specific
//! parser still pass through the seam — they accept the generic form and
//! raise NOT_IMPLEMENTED for the specific one.
//!
//! Parsers receive the first RDATA token and return the token that ended
//! the record, normally the line feed. RDATA accumulates in the parser's
//! buffer in wire format.

use super::name::{scan_name, unescape, NameBuf};
use super::Parser;
use crate::error::{semantic_error, Raise};
use crate::iana::Rtype;
use crate::scanner::Token;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// The RDATA size limit, including what a charstr may still add.
const MAX_RDLENGTH: usize = 65535;

//------------ Descriptor ----------------------------------------------------

/// How one record type is parsed and checked.
#[derive(Clone, Copy)]
pub(crate) struct Descriptor {
    /// Parses the representation format, if there is a specific one.
    pub parse: Option<fn(&mut Parser, Token) -> Result<Token, Raise>>,

    /// Checks wire-format RDATA from the generic form.
    pub check: fn(rdata: &[u8]) -> Result<(), &'static str>,
}

/// Returns the descriptor for a record type.
pub(crate) fn descriptor(rtype: Rtype) -> Descriptor {
    match rtype {
        Rtype::A => Descriptor {
            parse: Some(parse_a),
            check: check_a,
        },
        Rtype::Ns | Rtype::Cname | Rtype::Ptr => Descriptor {
            parse: Some(parse_host),
            check: check_host,
        },
        Rtype::Soa => Descriptor {
            parse: Some(parse_soa),
            check: check_soa,
        },
        Rtype::Mx => Descriptor {
            parse: Some(parse_mx),
            check: check_mx,
        },
        Rtype::Txt => Descriptor {
            parse: Some(parse_txt),
            check: check_txt,
        },
        Rtype::Aaaa => Descriptor {
            parse: Some(parse_aaaa),
            check: check_aaaa,
        },
        _ => Descriptor {
            parse: None,
            check: check_any,
        },
    }
}

//------------ Field helpers -------------------------------------------------

/// Parses an unsigned decimal number.
fn decimal<T: TryFrom<u64>>(bytes: &[u8]) -> Option<T> {
    if bytes.is_empty() {
        return None;
    }
    let mut value = 0u64;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add((byte - b'0') as u64)?;
        if value > u32::MAX as u64 {
            return None;
        }
    }
    T::try_from(value).ok()
}

impl Parser {
    /// Scans a 16 bit decimal field.
    fn scan_u16(
        &self,
        token: &Token,
        what: &str,
    ) -> Result<u16, Raise> {
        match decimal::<u16>(self.token_bytes(token)) {
            Some(value) => Ok(value),
            None => semantic_error!("Invalid {}", what),
        }
    }

    /// Scans a 32 bit decimal field.
    fn scan_u32(
        &self,
        token: &Token,
        what: &str,
    ) -> Result<u32, Raise> {
        match decimal::<u32>(self.token_bytes(token)) {
            Some(value) => Ok(value),
            None => semantic_error!("Invalid {}", what),
        }
    }

    /// Scans a domain name field and appends it to the RDATA buffer.
    fn append_name(
        &mut self,
        token: &Token,
        what: &str,
    ) -> Result<(), Raise> {
        self.require_string(token, what)?;
        let mut buf = NameBuf::root();
        {
            let file = self.file();
            let text = &file.buffer.data[token.start..token.end];
            if let Err(err) = scan_name(text, &file.origin, &mut buf) {
                semantic_error!("Invalid {}: {}", what, err);
            }
        }
        self.append_rdata(buf.as_slice())
    }

    /// Scans a character string and appends it to the RDATA buffer.
    fn append_charstr(
        &mut self,
        token: &Token,
        what: &str,
    ) -> Result<(), Raise> {
        let mut buf = [0u8; 255];
        let mut length = 0;
        {
            let bytes = self.token_bytes(token);
            let mut pos = 0;
            while pos < bytes.len() {
                let (byte, consumed) = match unescape(bytes, pos) {
                    Ok(symbol) => symbol,
                    Err(err) => semantic_error!("Invalid {}: {}", what, err),
                };
                if length == 255 {
                    semantic_error!("{} exceeds 255 octets", what);
                }
                buf[length] = byte;
                length += 1;
                pos += consumed;
            }
        }
        self.append_rdata(&[length as u8])?;
        self.append_rdata(&buf[..length])
    }

    /// Appends raw octets to the RDATA buffer, checking the size limit.
    fn append_rdata(&mut self, octets: &[u8]) -> Result<(), Raise> {
        if self.rdata.len() + octets.len() > MAX_RDLENGTH {
            semantic_error!("RDATA exceeds {} octets", MAX_RDLENGTH);
        }
        self.rdata.extend_from_slice(octets);
        Ok(())
    }
}

//------------ Specific parsers ----------------------------------------------

fn parse_a(parser: &mut Parser, token: Token) -> Result<Token, Raise> {
    parser.require_string(&token, "address in A record")?;
    let address = {
        let bytes = parser.token_bytes(&token);
        match core::str::from_utf8(bytes)
            .ok()
            .and_then(|text| Ipv4Addr::from_str(text).ok())
        {
            Some(address) => address,
            None => semantic_error!("Invalid address in A record"),
        }
    };
    parser.append_rdata(&address.octets())?;
    parser.lex_raw()
}

fn parse_aaaa(parser: &mut Parser, token: Token) -> Result<Token, Raise> {
    parser.require_string(&token, "address in AAAA record")?;
    let address = {
        let bytes = parser.token_bytes(&token);
        match core::str::from_utf8(bytes)
            .ok()
            .and_then(|text| Ipv6Addr::from_str(text).ok())
        {
            Some(address) => address,
            None => semantic_error!("Invalid address in AAAA record"),
        }
    };
    parser.append_rdata(&address.octets())?;
    parser.lex_raw()
}

/// NS, CNAME and PTR: a single host name.
fn parse_host(parser: &mut Parser, token: Token) -> Result<Token, Raise> {
    parser.append_name(&token, "host name")?;
    parser.lex_raw()
}

fn parse_mx(parser: &mut Parser, token: Token) -> Result<Token, Raise> {
    parser.require_string(&token, "preference in MX record")?;
    let preference =
        parser.scan_u16(&token, "preference in MX record")?;
    parser.append_rdata(&preference.to_be_bytes())?;
    let token = parser.lex_raw()?;
    parser.append_name(&token, "exchange in MX record")?;
    parser.lex_raw()
}

fn parse_soa(parser: &mut Parser, token: Token) -> Result<Token, Raise> {
    parser.append_name(&token, "primary server in SOA record")?;
    let token = parser.lex_raw()?;
    parser.append_name(&token, "mailbox in SOA record")?;

    let token = parser.lex_raw()?;
    parser.require_string(&token, "serial in SOA record")?;
    let serial = parser.scan_u32(&token, "serial in SOA record")?;
    parser.append_rdata(&serial.to_be_bytes())?;

    for what in ["refresh", "retry", "expire", "minimum"] {
        let token = parser.lex_raw()?;
        parser.require_string(&token, what)?;
        let value = parser.scan_ttl(&token)?;
        parser.append_rdata(&value.to_be_bytes())?;
    }
    parser.lex_raw()
}

fn parse_txt(parser: &mut Parser, token: Token) -> Result<Token, Raise> {
    parser.require_string(&token, "text in TXT record")?;
    parser.append_charstr(&token, "text in TXT record")?;
    loop {
        let token = parser.lex_raw()?;
        if !token.is_string() {
            return Ok(token);
        }
        parser.append_charstr(&token, "text in TXT record")?;
    }
}

//------------ Generic form --------------------------------------------------

impl Parser {
    /// Parses RFC 3597 generic RDATA, the `\#` marker already consumed.
    ///
    /// `\# <rdlength> <hex...>`, where the hex digits may be split into
    /// any number of tokens.
    pub(super) fn parse_unknown_rdata(&mut self) -> Result<Token, Raise> {
        let token = self.lex_raw()?;
        self.require_string(&token, "RDATA length")?;
        let rdlength = self.scan_u16(&token, "RDATA length")? as usize;

        let mut high: Option<u8> = None;
        loop {
            let token = self.lex_raw()?;
            if !token.is_string() {
                if high.is_some() {
                    semantic_error!("Odd number of hex digits in RDATA");
                }
                if self.rdata.len() != rdlength {
                    semantic_error!(
                        "RDATA length {} does not match {} octets of data",
                        rdlength,
                        self.rdata.len()
                    );
                }
                return Ok(token);
            }
            // Split borrows: the token text lives in the file window,
            // the output in the RDATA buffer.
            let file = self.files.last().expect("no open file");
            let bytes = &file.buffer.data[token.start..token.end];
            for &byte in bytes {
                let nibble = match (byte as char).to_digit(16) {
                    Some(nibble) => nibble as u8,
                    None => semantic_error!("Invalid hex digit in RDATA"),
                };
                match high.take() {
                    None => high = Some(nibble),
                    Some(high) => {
                        if self.rdata.len() == rdlength {
                            semantic_error!(
                                "RDATA exceeds declared length {}",
                                rdlength
                            );
                        }
                        self.rdata.push(high << 4 | nibble);
                    }
                }
            }
        }
    }
}

//------------ Wire checks ---------------------------------------------------

/// Walks one wire-format name, returning the octets it occupies.
fn walk_name(rdata: &[u8]) -> Result<usize, &'static str> {
    let mut pos = 0;
    loop {
        let length = match rdata.get(pos) {
            Some(&length) => length as usize,
            None => return Err("truncated domain name"),
        };
        if length > 63 {
            return Err("bad label length");
        }
        pos += 1 + length;
        if pos > 255 {
            return Err("domain name exceeds 255 octets");
        }
        if length == 0 {
            return Ok(pos);
        }
    }
}

fn check_any(_rdata: &[u8]) -> Result<(), &'static str> {
    Ok(())
}

fn check_a(rdata: &[u8]) -> Result<(), &'static str> {
    if rdata.len() == 4 {
        Ok(())
    } else {
        Err("A RDATA must be 4 octets")
    }
}

fn check_aaaa(rdata: &[u8]) -> Result<(), &'static str> {
    if rdata.len() == 16 {
        Ok(())
    } else {
        Err("AAAA RDATA must be 16 octets")
    }
}

fn check_host(rdata: &[u8]) -> Result<(), &'static str> {
    if walk_name(rdata)? == rdata.len() {
        Ok(())
    } else {
        Err("trailing octets after domain name")
    }
}

fn check_mx(rdata: &[u8]) -> Result<(), &'static str> {
    if rdata.len() < 2 {
        return Err("truncated preference");
    }
    if walk_name(&rdata[2..])? == rdata.len() - 2 {
        Ok(())
    } else {
        Err("trailing octets after exchange name")
    }
}

fn check_soa(rdata: &[u8]) -> Result<(), &'static str> {
    let mname = walk_name(rdata)?;
    let rname = walk_name(&rdata[mname..])?;
    if rdata.len() == mname + rname + 20 {
        Ok(())
    } else {
        Err("SOA RDATA has a bad length")
    }
}

fn check_txt(rdata: &[u8]) -> Result<(), &'static str> {
    if rdata.is_empty() {
        return Err("TXT RDATA must hold at least one string");
    }
    let mut pos = 0;
    while pos < rdata.len() {
        pos += 1 + rdata[pos] as usize;
    }
    if pos == rdata.len() {
        Ok(())
    } else {
        Err("truncated character string")
    }
}

//============ Testing =======================================================
