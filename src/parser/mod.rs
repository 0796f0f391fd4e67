//! The record-level parser.
//!
//! [`Parser`] drives the tokenizer and assembles resource records: the
//! owner name (explicit or inherited), the optional TTL and class in
//! either order, the record type, and the type's RDATA in wire format.
//! Finished records go to a caller-supplied [`Accept`] sink. The control
//! entries `$ORIGIN`, `$TTL` and `$INCLUDE` are handled here as well;
//! `$INCLUDE` pushes another file onto the include stack.

pub(crate) mod name;
pub(crate) mod rdata;

use self::name::{scan_name, unescape, NameBuf};
use self::rdata::descriptor;
use crate::error::{
    not_implemented, not_permitted, raise, semantic_error, site,
    syntax_error, Code, Error, Raise,
};
use crate::iana::{Class, Rtype};
use crate::log::{self, Category, Log, Site};
use crate::scanner::{Token, TokenCode};
use crate::source::SourceFile;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::trace;

/// The maximum depth of the include stack.
///
/// Include cycles run into this limit rather than looping forever.
const MAX_INCLUDE_DEPTH: usize = 16;

//------------ Options -------------------------------------------------------

/// Configuration for a [`Parser`].
#[derive(Clone, Debug)]
pub struct Options {
    /// The initial origin, in representation format. Required.
    pub origin: String,

    /// The TTL of records before any explicit TTL or `$TTL` directive.
    pub default_ttl: u32,

    /// The class of records before any explicit class.
    pub default_class: Class,

    /// Lax mode of operation.
    ///
    /// Authoritative servers may choose to be more lenient when operating
    /// as a secondary as data may have been transferred over AXFR/IXFR
    /// that would have triggered an error otherwise.
    pub secondary: bool,

    /// Disable the `$INCLUDE` directive.
    ///
    /// Useful in setups where untrusted input may be offered.
    pub no_includes: bool,

    /// Accept `1h2m3s` style notation in TTL fields.
    pub friendly_ttls: bool,

    /// The [`Category`] bits to write out.
    ///
    /// All categories are written if no categories are selected and no
    /// log handler was installed.
    pub log_categories: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            origin: String::new(),
            default_ttl: 3600,
            default_class: Class::In,
            secondary: false,
            no_includes: false,
            friendly_ttls: false,
            log_categories: 0,
        }
    }
}

//------------ ScannedRecord -------------------------------------------------

/// A record on its way to the sink.
///
/// The borrowed buffers are valid only for the duration of the
/// [`Accept::add`] call.
#[derive(Clone, Copy, Debug)]
pub struct ScannedRecord<'a> {
    /// The owner name in wire format.
    pub owner: &'a [u8],

    /// The record type.
    pub rtype: Rtype,

    /// The record class.
    pub class: Class,

    /// The time to live in seconds.
    pub ttl: u32,

    /// The record data in wire format.
    pub rdata: &'a [u8],
}

//------------ Accept --------------------------------------------------------

/// The record sink.
///
/// [`add`][Self::add] is invoked for every record, synchronously on the
/// caller's thread. Returning an error aborts parsing; the value is
/// propagated verbatim as the parser's return code and should be
/// negative to stay disjoint from the parser's own codes.
pub trait Accept {
    fn add(&mut self, record: &ScannedRecord<'_>) -> Result<(), i32>;
}

impl<F: FnMut(&ScannedRecord<'_>) -> Result<(), i32>> Accept for F {
    fn add(&mut self, record: &ScannedRecord<'_>) -> Result<(), i32> {
        self(record)
    }
}

//------------ Parser --------------------------------------------------------

/// A zone file parser.
///
/// A parser handles one input stream at a time; concurrent use requires
/// independent instances. All buffers are released on drop.
pub struct Parser {
    options: Options,

    /// The include stack. The active file is the last entry.
    pub(crate) files: Vec<SourceFile>,

    /// The RDATA assembly buffer, wire format.
    pub(crate) rdata: Vec<u8>,

    log: Option<Box<dyn Log>>,
}

impl Parser {
    //--- Lifecycle

    /// Opens a parser over a zone file.
    pub fn open_file(
        options: &Options,
        path: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        Self::finish_open(path.display().to_string(), options, |o, c, t| {
            SourceFile::open(path, o, c, t)
        })
    }

    /// Opens a parser over an in-memory string.
    pub fn open_string(
        options: &Options,
        text: impl AsRef<[u8]>,
    ) -> Result<Self, Error> {
        Self::finish_open("<string>".into(), options, |o, c, t| {
            Ok(SourceFile::from_bytes(text.as_ref(), o, c, t))
        })
    }

    /// Opens a parser over an arbitrary reader.
    pub fn open_reader(
        options: &Options,
        name: impl Into<String>,
        reader: impl Read + 'static,
    ) -> Result<Self, Error> {
        let name = name.into();
        let reader_name = name.clone();
        Self::finish_open(name, options, move |o, c, t| {
            Ok(SourceFile::from_reader(
                reader_name,
                Box::new(reader),
                o,
                c,
                t,
            ))
        })
    }

    fn finish_open(
        name: String,
        options: &Options,
        open: impl FnOnce(NameBuf, Class, u32) -> Result<SourceFile, Raise>,
    ) -> Result<Self, Error> {
        match Self::try_open(options, open) {
            Ok(parser) => Ok(parser),
            Err(err) => Err(Error::new(err.code, name, 0, err.message)),
        }
    }

    fn try_open(
        options: &Options,
        open: impl FnOnce(NameBuf, Class, u32) -> Result<SourceFile, Raise>,
    ) -> Result<Self, Raise> {
        let origin = Self::check_options(options)?;
        let file =
            open(origin, options.default_class, options.default_ttl)?;
        Ok(Parser {
            options: options.clone(),
            files: vec![file],
            rdata: Vec::new(),
            log: None,
        })
    }

    fn check_options(options: &Options) -> Result<NameBuf, Raise> {
        if options.origin.is_empty() {
            raise!(Code::BadParameter, "No origin specified");
        }
        if options.default_ttl > i32::MAX as u32 {
            raise!(Code::BadParameter, "Default TTL exceeds maximum value");
        }
        let mut origin = NameBuf::root();
        if let Err(err) =
            scan_name(options.origin.as_bytes(), &NameBuf::root(), &mut origin)
        {
            raise!(Code::BadParameter, "Invalid origin: {}", err);
        }
        Ok(origin)
    }

    /// Installs a log handler.
    pub fn set_log(&mut self, log: impl Log + 'static) {
        self.log = Some(Box::new(log));
    }

    /// Parses a zone file to completion, one-shot.
    pub fn parse_file(
        options: &Options,
        path: impl AsRef<Path>,
        accept: &mut dyn Accept,
    ) -> Result<(), Error> {
        Self::open_file(options, path)?.parse(accept)
    }

    /// Parses an in-memory string to completion, one-shot.
    pub fn parse_string(
        options: &Options,
        text: impl AsRef<[u8]>,
        accept: &mut dyn Accept,
    ) -> Result<(), Error> {
        Self::open_string(options, text)?.parse(accept)
    }

    //--- The token interface

    /// Returns the next token of the input.
    ///
    /// This is the streaming tokenizer itself: record parsing sits on
    /// top of it, but it can just as well be driven directly.
    pub fn lex(&mut self) -> Result<Token, Error> {
        match self.lex_raw() {
            Ok(token) => Ok(token),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Returns the bytes of a token.
    ///
    /// For contiguous tokens this is the raw input, escape sequences
    /// included; for quoted tokens the interior of the string. The
    /// returned slice is only valid until the next token is read.
    pub fn token_bytes(&self, token: &Token) -> &[u8] {
        &self.file().buffer.data[token.start..token.end]
    }

    /// Returns the line number the parser has reached.
    pub fn line(&self) -> usize {
        self.file().line
    }

    pub(crate) fn lex_raw(&mut self) -> Result<Token, Raise> {
        loop {
            let file = self.files.last_mut().expect("no open file");
            match file.next_token()? {
                Some(token) => return Ok(token),
                None => {
                    if self.files.len() > 1 {
                        trace!("leaving included file");
                        self.files.pop();
                        continue;
                    }
                    return Ok(Token::end_of_file(
                        self.file().buffer.length,
                    ));
                }
            }
        }
    }

    pub(crate) fn file(&self) -> &SourceFile {
        self.files.last().expect("no open file")
    }

    fn file_mut(&mut self) -> &mut SourceFile {
        self.files.last_mut().expect("no open file")
    }

    /// Checks that the token is a contiguous or quoted string.
    pub(crate) fn require_string(
        &self,
        token: &Token,
        what: &str,
    ) -> Result<(), Raise> {
        if token.is_string() {
            Ok(())
        } else {
            syntax_error!("Missing {}", what)
        }
    }

    fn require_line_feed(&mut self) -> Result<(), Raise> {
        let token = self.lex_raw()?;
        match token.code {
            TokenCode::LineFeed | TokenCode::EndOfFile => Ok(()),
            _ => syntax_error!("Trailing data in entry"),
        }
    }

    fn leading_digit(&self, token: &Token) -> bool {
        self.token_bytes(token)
            .first()
            .map_or(false, u8::is_ascii_digit)
    }

    //--- The record loop

    /// Drives the token loop to completion.
    pub fn parse(&mut self, accept: &mut dyn Accept) -> Result<(), Error> {
        match self.parse_raw(accept) {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn parse_raw(&mut self, accept: &mut dyn Accept) -> Result<(), Raise> {
        loop {
            let token = self.lex_raw()?;
            match token.code {
                TokenCode::Contiguous => {
                    if self.file().start_of_line
                        && self.token_bytes(&token).first()
                            == Some(&b'$')
                    {
                        self.parse_dollar(&token)?;
                    } else {
                        self.parse_rr(token, accept)?;
                    }
                }
                TokenCode::Quoted => self.parse_rr(token, accept)?,
                TokenCode::LineFeed => continue,
                TokenCode::EndOfFile => return Ok(()),
            }
        }
    }

    /// Parses one resource record.
    ///
    /// `token` is the first token of the record. If the record starts a
    /// line it carries the owner; otherwise the last explicit owner is
    /// inherited. TTL and class are optional and may precede each other.
    fn parse_rr(
        &mut self,
        token: Token,
        accept: &mut dyn Accept,
    ) -> Result<(), Raise> {
        let mut token = token;
        if self.file().start_of_line {
            self.scan_owner(&token)?;
            token = self.lex_raw()?;
        }
        self.require_string(&token, "record type")?;

        let mut class = None;
        let mut ttl = None;
        let rtype;

        if self.leading_digit(&token) {
            ttl = Some(self.scan_ttl(&token)?);
            token = self.lex_raw()?;
            self.require_string(&token, "record type")?;
            match self.scan_type_or_class(&token)? {
                TypeOrClass::Type(found) => rtype = found,
                TypeOrClass::Class(found) => {
                    class = Some(found);
                    token = self.lex_raw()?;
                    self.require_string(&token, "record type")?;
                    rtype = self.scan_type(&token)?;
                }
            }
        } else {
            match self.scan_type_or_class(&token)? {
                TypeOrClass::Type(found) => rtype = found,
                TypeOrClass::Class(found) => {
                    class = Some(found);
                    token = self.lex_raw()?;
                    self.require_string(&token, "record type")?;
                    if self.leading_digit(&token) {
                        ttl = Some(self.scan_ttl(&token)?);
                        token = self.lex_raw()?;
                        self.require_string(&token, "record type")?;
                    }
                    rtype = self.scan_type(&token)?;
                }
            }
        }

        {
            let file = self.file_mut();
            if let Some(class) = class {
                file.last_class = class;
            }
            if let Some(ttl) = ttl {
                file.last_ttl = ttl;
            }
        }

        // Dispatch on the type descriptor, unless the RDATA is in the
        // generic notation of RFC 3597, which works for every type and
        // is checked against the descriptor afterwards.
        let descriptor = descriptor(rtype);
        self.rdata.clear();
        let token = self.lex_raw()?;
        let terminal = if token.code == TokenCode::Contiguous
            && self.token_bytes(&token) == b"\\#"
        {
            let terminal = self.parse_unknown_rdata()?;
            if let Err(err) = (descriptor.check)(&self.rdata) {
                semantic_error!("Bad {} record: {}", rtype, err);
            }
            terminal
        } else {
            match descriptor.parse {
                Some(parse) => parse(self, token)?,
                None => not_implemented!(
                    "Record type {} is not implemented",
                    rtype
                ),
            }
        };
        match terminal.code {
            TokenCode::LineFeed | TokenCode::EndOfFile => {}
            _ => syntax_error!("Trailing data in record"),
        }

        let file = self.files.last().expect("no open file");
        let record = ScannedRecord {
            owner: file.owner.as_slice(),
            rtype,
            class: file.last_class,
            ttl: file.last_ttl,
            rdata: &self.rdata,
        };
        match accept.add(&record) {
            Ok(()) => Ok(()),
            Err(code) => {
                raise!(
                    Code::from_int(code),
                    "Record sink returned {}",
                    code
                )
            }
        }
    }

    fn scan_owner(&mut self, token: &Token) -> Result<(), Raise> {
        self.require_string(token, "owner")?;
        let mut buf = NameBuf::root();
        {
            let file = self.file();
            let text = &file.buffer.data[token.start..token.end];
            if let Err(err) = scan_name(text, &file.origin, &mut buf) {
                semantic_error!("Invalid owner: {}", err);
            }
        }
        self.file_mut().owner = buf;
        Ok(())
    }

    fn scan_type_or_class(
        &self,
        token: &Token,
    ) -> Result<TypeOrClass, Raise> {
        let bytes = self.token_bytes(token);
        if let Some(rtype) = Rtype::from_bytes(bytes) {
            return Ok(TypeOrClass::Type(rtype));
        }
        if let Some(class) = Class::from_bytes(bytes) {
            return Ok(TypeOrClass::Class(class));
        }
        semantic_error!("Invalid record type or class")
    }

    fn scan_type(&self, token: &Token) -> Result<Rtype, Raise> {
        match Rtype::from_bytes(self.token_bytes(token)) {
            Some(rtype) => Ok(rtype),
            None => semantic_error!("Invalid record type"),
        }
    }

    /// Scans a TTL field.
    pub(crate) fn scan_ttl(&mut self, token: &Token) -> Result<u32, Raise> {
        let value = match ttl_value(
            self.token_bytes(token),
            self.options.friendly_ttls,
        ) {
            Some(value) => value,
            None => semantic_error!("Invalid TTL"),
        };
        if value > i32::MAX as u32 {
            if !self.options.secondary {
                semantic_error!("TTL {} exceeds maximum value", value);
            }
            self.warning(
                site!(),
                format!("TTL {} exceeds maximum value, clamping", value),
            );
            return Ok(i32::MAX as u32);
        }
        Ok(value)
    }

    //--- Control entries

    fn parse_dollar(&mut self, token: &Token) -> Result<(), Raise> {
        let directive = {
            let bytes = self.token_bytes(token);
            if bytes.eq_ignore_ascii_case(b"$ORIGIN") {
                Directive::Origin
            } else if bytes.eq_ignore_ascii_case(b"$TTL") {
                Directive::Ttl
            } else if bytes.eq_ignore_ascii_case(b"$INCLUDE") {
                Directive::Include
            } else {
                Directive::Unknown
            }
        };

        match directive {
            Directive::Origin => {
                let token = self.lex_raw()?;
                self.require_string(&token, "origin in $ORIGIN")?;
                let origin = self.scan_name_token(&token)?;
                self.file_mut().origin = origin;
                self.require_line_feed()
            }
            Directive::Ttl => {
                let token = self.lex_raw()?;
                self.require_string(&token, "TTL in $TTL")?;
                let value = self.scan_ttl(&token)?;
                let file = self.file_mut();
                file.default_ttl = value;
                file.last_ttl = value;
                self.require_line_feed()
            }
            Directive::Include => self.parse_include(),
            Directive::Unknown => not_implemented!("Unknown directive"),
        }
    }

    fn parse_include(&mut self) -> Result<(), Raise> {
        let token = self.lex_raw()?;
        self.require_string(&token, "path in $INCLUDE")?;
        if self.options.no_includes {
            semantic_error!("$INCLUDE directive is disabled");
        }
        if self.files.len() >= MAX_INCLUDE_DEPTH {
            not_permitted!(
                "$INCLUDE exceeds maximum depth of {}",
                MAX_INCLUDE_DEPTH
            );
        }

        let path = {
            let bytes = self.token_bytes(&token);
            let mut decoded = Vec::with_capacity(bytes.len());
            let mut pos = 0;
            while pos < bytes.len() {
                match unescape(bytes, pos) {
                    Ok((byte, consumed)) => {
                        decoded.push(byte);
                        pos += consumed;
                    }
                    Err(err) => {
                        semantic_error!("Invalid path in $INCLUDE: {}", err)
                    }
                }
            }
            match String::from_utf8(decoded) {
                Ok(path) => path,
                Err(_) => {
                    semantic_error!("Invalid path in $INCLUDE")
                }
            }
        };

        let token = self.lex_raw()?;
        let origin = if token.is_string() {
            let origin = self.scan_name_token(&token)?;
            self.require_line_feed()?;
            Some(origin)
        } else {
            None
        };

        // Relative paths resolve against the including file's directory.
        let path = PathBuf::from(path);
        let resolved = if path.is_absolute() {
            path
        } else {
            match self.file().path.as_deref().and_then(Path::parent) {
                Some(dir) => dir.join(path),
                None => path,
            }
        };

        let (inherited_origin, owner, last_class, last_ttl, default_ttl) = {
            let file = self.file();
            (
                file.origin,
                file.owner,
                file.last_class,
                file.last_ttl,
                file.default_ttl,
            )
        };
        trace!(path = %resolved.display(), "entering included file");
        let mut file = SourceFile::open(
            &resolved,
            origin.unwrap_or(inherited_origin),
            last_class,
            last_ttl,
        )?;
        file.owner = owner;
        file.default_ttl = default_ttl;
        self.files.push(file);
        Ok(())
    }

    /// Scans a name token against the current origin.
    fn scan_name_token(&self, token: &Token) -> Result<NameBuf, Raise> {
        let mut buf = NameBuf::root();
        let file = self.file();
        let text = &file.buffer.data[token.start..token.end];
        if let Err(err) = scan_name(text, &file.origin, &mut buf) {
            semantic_error!("Invalid domain name: {}", err);
        }
        Ok(buf)
    }

    //--- Logging

    fn fail(&mut self, err: Raise) -> Error {
        let (file, line) = {
            let file = self.file();
            (file.name().to_string(), file.line)
        };
        let formatted = format!("{}:{}: {}", file, line, err.message);
        self.log(err.site, Category::Error, &formatted);
        Error::new(err.code, file, line, err.message)
    }

    fn warning(&mut self, site: Site, message: String) {
        let formatted = {
            let file = self.file();
            format!("{}:{}: {}", file.name(), file.line, message)
        };
        self.log(site, Category::Warning, &formatted);
    }

    fn log(&mut self, site: Site, category: Category, message: &str) {
        let mask =
            if self.options.log_categories == 0 && self.log.is_none() {
                !0
            } else {
                self.options.log_categories
            };
        if mask & category.mask() == 0 {
            return;
        }
        match self.log.as_mut() {
            Some(log) => log.write(&site, category, message),
            None => log::fallback(&site, category, message),
        }
    }
}

//------------ TypeOrClass ---------------------------------------------------

/// The outcome of scanning a field that may be a type or a class.
enum TypeOrClass {
    Type(Rtype),
    Class(Class),
}

//------------ Directive -----------------------------------------------------

enum Directive {
    Origin,
    Ttl,
    Include,
    Unknown,
}

//------------ ttl_value -----------------------------------------------------

/// Parses a TTL value, optionally in `1h2m3s` notation.
fn ttl_value(bytes: &[u8], friendly: bool) -> Option<u32> {
    let mut total = 0u64;
    let mut number: Option<u64> = None;
    let mut any_unit = false;
    for &byte in bytes {
        if byte.is_ascii_digit() {
            let digit = (byte - b'0') as u64;
            number =
                Some(number.unwrap_or(0).checked_mul(10)?.checked_add(digit)?);
        } else {
            if !friendly {
                return None;
            }
            let unit: u64 = match byte.to_ascii_lowercase() {
                b's' => 1,
                b'm' => 60,
                b'h' => 60 * 60,
                b'd' => 24 * 60 * 60,
                b'w' => 7 * 24 * 60 * 60,
                _ => return None,
            };
            total = total.checked_add(number.take()?.checked_mul(unit)?)?;
            any_unit = true;
        }
    }
    match number {
        Some(number) => total = total.checked_add(number)?,
        None => {
            if !any_unit {
                return None;
            }
        }
    }
    if total > u32::MAX as u64 {
        None
    } else {
        Some(total as u32)
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ttl_values() {
        assert_eq!(ttl_value(b"0", false), Some(0));
        assert_eq!(ttl_value(b"3600", false), Some(3600));
        assert_eq!(ttl_value(b"1h", false), None);
        assert_eq!(ttl_value(b"", false), None);
        assert_eq!(ttl_value(b"12x", false), None);

        assert_eq!(ttl_value(b"1h2m3s", true), Some(3723));
        assert_eq!(ttl_value(b"1H2M3S", true), Some(3723));
        assert_eq!(ttl_value(b"2w", true), Some(1209600));
        assert_eq!(ttl_value(b"1d12h", true), Some(129600));
        assert_eq!(ttl_value(b"1h30", true), Some(3630));
        assert_eq!(ttl_value(b"h", true), None);
        assert_eq!(ttl_value(b"99999999999999999999s", true), None);
    }

    #[derive(Default, Debug)]
    struct Records(
        Vec<(Vec<u8>, Rtype, Class, u32, Vec<u8>)>,
    );

    impl Accept for Records {
        fn add(&mut self, record: &ScannedRecord<'_>) -> Result<(), i32> {
            self.0.push((
                record.owner.to_vec(),
                record.rtype,
                record.class,
                record.ttl,
                record.rdata.to_vec(),
            ));
            Ok(())
        }
    }

    fn options() -> Options {
        Options {
            origin: "example.com.".into(),
            ..Default::default()
        }
    }

    fn parse(text: &str) -> Result<Records, Error> {
        let mut records = Records::default();
        Parser::parse_string(&options(), text, &mut records)?;
        Ok(records)
    }

    fn name(text: &str) -> Vec<u8> {
        let mut buf = NameBuf::root();
        scan_name(text.as_bytes(), &NameBuf::root(), &mut buf).unwrap();
        buf.as_slice().to_vec()
    }

    #[test]
    fn simple_record() {
        let records = parse("www 3600 IN A 192.0.2.1\n").unwrap().0;
        assert_eq!(records.len(), 1);
        let (owner, rtype, class, ttl, rdata) = &records[0];
        assert_eq!(owner, &name("www.example.com."));
        assert_eq!(*rtype, Rtype::A);
        assert_eq!(*class, Class::In);
        assert_eq!(*ttl, 3600);
        assert_eq!(rdata, &[192, 0, 2, 1]);
    }

    #[test]
    fn class_and_ttl_in_either_order() {
        let records =
            parse("a IN 60 A 192.0.2.1\nb 60 IN A 192.0.2.2\n")
                .unwrap()
                .0;
        assert_eq!(records[0].3, 60);
        assert_eq!(records[1].3, 60);
    }

    #[test]
    fn owner_ttl_and_class_are_inherited() {
        let records = parse(
            "a 60 IN A 192.0.2.1\n   A 192.0.2.2\nb A 192.0.2.3\n",
        )
        .unwrap()
        .0;
        // The indented record inherits the owner of the previous one.
        assert_eq!(records[1].0, name("a.example.com."));
        assert_eq!(records[1].3, 60);
        // An owner resets, TTL and class stick.
        assert_eq!(records[2].0, name("b.example.com."));
        assert_eq!(records[2].3, 60);
    }

    #[test]
    fn at_owner_is_the_origin() {
        let records = parse("@ IN A 192.0.2.1\n").unwrap().0;
        assert_eq!(records[0].0, name("example.com."));
    }

    #[test]
    fn dollar_origin_and_ttl() {
        let records = parse(
            "$ORIGIN sub.example.com.\n$TTL 300\nwww A 192.0.2.1\n",
        )
        .unwrap()
        .0;
        assert_eq!(records[0].0, name("www.sub.example.com."));
        assert_eq!(records[0].3, 300);
    }

    #[test]
    fn directives_match_case_insensitively() {
        let records =
            parse("$origin other.test.\n$ttl 60\nwww A 192.0.2.1\n")
                .unwrap()
                .0;
        assert_eq!(records[0].0, name("www.other.test."));
        assert_eq!(records[0].3, 60);
    }

    #[test]
    fn unknown_directive_is_not_implemented() {
        let err = parse("$GENERATE 1-10 a A 192.0.2.1\n").unwrap_err();
        assert_eq!(err.code(), Code::NotImplemented);
    }

    #[test]
    fn mx_and_txt_records() {
        let records = parse(
            "@ MX 10 mail\n@ TXT \"hello world\" abc\n",
        )
        .unwrap()
        .0;
        let mut mx = vec![0, 10];
        mx.extend(name("mail.example.com."));
        assert_eq!(records[0].4, mx);
        let mut txt = vec![11];
        txt.extend(b"hello world");
        txt.push(3);
        txt.extend(b"abc");
        assert_eq!(records[1].4, txt);
    }

    #[test]
    fn soa_record_with_group() {
        let records = parse(
            "@ IN SOA ns hostmaster (\n\
             \t2024010101 ; serial\n\
             \t3h         ; refresh\n\
             \t15m        ; retry\n\
             \t2w         ; expire\n\
             \t5m )       ; minimum\n",
        );
        // Friendly TTLs are off: the 3h refresh must be rejected.
        assert!(records.is_err());

        let mut options = options();
        options.friendly_ttls = true;
        let mut records = Records::default();
        Parser::parse_string(
            &options,
            "@ IN SOA ns hostmaster (\n\
             \t2024010101 ; serial\n\
             \t3h         ; refresh\n\
             \t15m        ; retry\n\
             \t2w         ; expire\n\
             \t5m )       ; minimum\n",
            &mut records,
        )
        .unwrap();
        let rdata = &records.0[0].4;
        let mut want = name("ns.example.com.");
        want.extend(name("hostmaster.example.com."));
        want.extend(2024010101u32.to_be_bytes());
        want.extend(10800u32.to_be_bytes());
        want.extend(900u32.to_be_bytes());
        want.extend(1209600u32.to_be_bytes());
        want.extend(300u32.to_be_bytes());
        assert_eq!(rdata, &want);
    }

    #[test]
    fn generic_rdata_parses_and_checks() {
        let records =
            parse("a IN TYPE1 \\# 4 c0 00 02 01\n").unwrap().0;
        assert_eq!(records[0].1, Rtype::A);
        assert_eq!(records[0].4, vec![0xc0, 0x00, 0x02, 0x01]);

        // The declared length must match the data.
        let err = parse("a IN TYPE1 \\# 5 c0000201\n").unwrap_err();
        assert_eq!(err.code(), Code::SemanticError);

        // The descriptor check runs on generic input.
        let err = parse("a IN A \\# 3 c00002\n").unwrap_err();
        assert_eq!(err.code(), Code::SemanticError);

        // Unknown types accept generic data.
        let records = parse("a IN TYPE62347 \\# 2 beef\n").unwrap().0;
        assert_eq!(records[0].1, Rtype::Int(62347));
        assert_eq!(records[0].4, vec![0xbe, 0xef]);
    }

    #[test]
    fn unimplemented_type_without_generic_form() {
        let err = parse("a IN SRV 1 2 3 target\n").unwrap_err();
        assert_eq!(err.code(), Code::NotImplemented);
    }

    #[test]
    fn sink_abort_propagates_verbatim() {
        let mut calls = 0;
        let mut sink = |_: &ScannedRecord<'_>| -> Result<(), i32> {
            calls += 1;
            Err(-4242)
        };
        let err = Parser::parse_string(
            &options(),
            "a A 192.0.2.1\nb A 192.0.2.2\n",
            &mut sink,
        )
        .unwrap_err();
        assert_eq!(err.code(), Code::Other(-4242));
        assert_eq!(err.code().to_int(), -4242);
        assert_eq!(calls, 1);
    }

    #[test]
    fn missing_origin_is_a_bad_parameter() {
        let mut records = Records::default();
        let err = Parser::parse_string(
            &Options::default(),
            "a A 192.0.2.1\n",
            &mut records,
        )
        .unwrap_err();
        assert_eq!(err.code(), Code::BadParameter);
    }

    #[test]
    fn ttl_range_is_enforced() {
        let err = parse("a 2147483648 IN A 192.0.2.1\n").unwrap_err();
        assert_eq!(err.code(), Code::SemanticError);

        // Secondary mode clamps with a warning instead.
        let mut options = options();
        options.secondary = true;
        let mut records = Records::default();
        Parser::parse_string(
            &options,
            "a 2147483648 IN A 192.0.2.1\n",
            &mut records,
        )
        .unwrap();
        assert_eq!(records.0[0].3, i32::MAX as u32);
    }

    #[test]
    fn line_numbers_in_errors() {
        let err = parse("a A 192.0.2.1\nb A not-an-address\n")
            .unwrap_err();
        assert_eq!(err.line(), 2);

        let err = parse("a (\n").unwrap_err();
        assert_eq!(err.line(), 2);
        assert_eq!(err.code(), Code::SyntaxError);
    }

    #[test]
    fn log_handler_sees_errors() {
        let mut parser = Parser::open_string(
            &options(),
            "a A not-an-address\n",
        )
        .unwrap();
        let messages = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink_messages = messages.clone();
        parser.set_log(
            move |_site: &Site, category: Category, message: &str| {
                sink_messages
                    .borrow_mut()
                    .push((category, message.to_string()));
            },
        );
        let mut records = Records::default();
        // With a handler installed and no categories selected, nothing
        // is delivered.
        parser.parse(&mut records).unwrap_err();
        assert!(messages.borrow().is_empty());

        let mut with_categories = options();
        with_categories.log_categories = Category::Error.mask();
        let mut parser = Parser::open_string(
            &with_categories,
            "a A not-an-address\n",
        )
        .unwrap();
        let sink_messages = messages.clone();
        parser.set_log(
            move |_site: &Site, category: Category, message: &str| {
                sink_messages
                    .borrow_mut()
                    .push((category, message.to_string()));
            },
        );
        parser.parse(&mut records).unwrap_err();
        let messages = messages.borrow();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, Category::Error);
        assert!(messages[0].1.contains("<string>:1:"));
    }
}
