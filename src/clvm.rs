// CLVM text assembler and disassembler over `clvmr` nodes.
// Serialization is `clvmr`'s and the puzzle hash is `clvm_utils`' tree hash, so
// the reveal and hash match what `opc` / `opc -H` print.

use chia::clvm_utils::tree_hash_from_bytes;
use chia::protocol::{Bytes32, Program};
use clvmr::allocator::{Allocator, NodePtr, SExp};
use clvmr::serde::{node_from_bytes, node_to_bytes};
use std::fmt;

use crate::error::{Error, Result};

/// Opcode keywords in opcode order; `.` marks an unassigned slot.
const KEYWORDS: &[&str] = &[
    ".", "q", "a", "i", "c", "f", "r", "l", "x",
    "=", ">s", "sha256", "substr", "strlen", "concat", ".",
    "+", "-", "*", "/", "divmod", ">", "ash", "lsh",
    "logand", "logior", "logxor", "lognot", ".",
    "point_add", "pubkey_for_exp", ".",
    "not", "any", "all", ".",
    "softfork",
];

/// Assembles CLVM text (as printed by the compiler) into a serialized program.
pub fn assemble(text: &str) -> Result<Program> {
    let tokens = tokenize(text)?;
    let mut a = Allocator::new();
    let mut pos = 0;
    let node = parse_expr(&mut a, &tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(Error::encoding("program text", "unexpected tokens after expression"));
    }
    to_program(&a, node)
}

/// Serializes a proper list of atoms, e.g. a solution `(tag owner amount)`.
pub fn atom_list(atoms: &[&[u8]]) -> Result<Program> {
    let mut a = Allocator::new();
    let mut list = a.nil();
    for atom in atoms.iter().rev() {
        let item = a.new_atom(atom).map_err(alloc_err)?;
        list = a.new_pair(item, list).map_err(alloc_err)?;
    }
    to_program(&a, list)
}

/// The atoms of `program` if it is a proper list of atoms; `None` otherwise.
pub fn list_atoms(program: &Program) -> Result<Option<Vec<Vec<u8>>>> {
    let mut a = Allocator::new();
    let mut cur = parse(&mut a, program)?;
    let mut out = Vec::new();
    loop {
        match a.sexp(cur) {
            SExp::Pair(first, rest) => {
                match a.sexp(first) {
                    SExp::Pair(..) => return Ok(None),
                    _ => out.push(a.atom(first).to_vec()),
                }
                cur = rest;
            }
            _ if a.atom(cur).is_empty() => return Ok(Some(out)),
            _ => return Ok(None),
        }
    }
}

/// sha256 tree hash of the program; a coin locked by it carries this puzzle hash.
pub fn tree_hash(program: &Program) -> Result<Bytes32> {
    let hash = tree_hash_from_bytes(program_bytes(program)).map_err(|e| Error::decode("program bytes", e))?;
    Ok(Bytes32::new(hash.to_bytes()))
}

/// Lowercase hex of the serialization, without a `0x` prefix.
pub fn to_hex(program: &Program) -> String {
    hex::encode(program_bytes(program))
}

/// Parses a hex serialization; rejects malformed, trailing or non-canonical bytes.
pub fn from_hex(text: &str) -> Result<Program> {
    let text = text.trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    let bytes = hex::decode(text).map_err(|e| Error::decode("program hex", e))?;
    let program = Program::from(bytes);
    let mut a = Allocator::new();
    let node = parse(&mut a, &program)?;
    let canonical = node_to_bytes(&a, node).map_err(|e| Error::decode("program bytes", format!("{e:?}")))?;
    if canonical.as_slice() != program_bytes(&program) {
        return Err(Error::decode("program bytes", "trailing or non-canonical bytes"));
    }
    Ok(program)
}

/// Renders the program back to text that `assemble` turns into the same bytes.
pub fn disassemble(program: &Program) -> Result<String> {
    let mut a = Allocator::new();
    let node = parse(&mut a, program)?;
    let mut out = String::new();
    write_node(&a, node, &mut out);
    Ok(out)
}

/// Minimal big-endian two's complement encoding; zero is the empty atom.
pub fn int_to_bytes(value: i128) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let full = value.to_be_bytes();
    let mut start = 0;
    while start < full.len() - 1 {
        let cur = full[start];
        let next_high = full[start + 1] & 0x80;
        if (cur == 0x00 && next_high == 0) || (cur == 0xff && next_high != 0) {
            start += 1;
        } else {
            break;
        }
    }
    full[start..].to_vec()
}

/// Inverse of `int_to_bytes`; `None` if the atom does not fit an `i128`.
pub fn bytes_to_int(bytes: &[u8]) -> Option<i128> {
    if bytes.is_empty() {
        return Some(0);
    }
    if bytes.len() > 16 {
        return None;
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Some(i128::from_be_bytes(buf))
}

fn program_bytes(program: &Program) -> &[u8] {
    program.as_ref()
}

fn parse(a: &mut Allocator, program: &Program) -> Result<NodePtr> {
    node_from_bytes(a, program_bytes(program)).map_err(|e| Error::decode("program bytes", format!("{e:?}")))
}

fn to_program(a: &Allocator, node: NodePtr) -> Result<Program> {
    let bytes = node_to_bytes(a, node).map_err(alloc_err)?;
    Ok(Program::from(bytes))
}

fn alloc_err(e: impl fmt::Debug) -> Error {
    Error::encoding("program", format!("{e:?}"))
}

fn write_node(a: &Allocator, node: NodePtr, out: &mut String) {
    match a.sexp(node) {
        SExp::Pair(first, rest) => {
            out.push('(');
            write_node(a, first, out);
            let mut cur = rest;
            loop {
                match a.sexp(cur) {
                    SExp::Pair(item, next) => {
                        out.push(' ');
                        write_node(a, item, out);
                        cur = next;
                    }
                    _ => {
                        let tail = a.atom(cur).to_vec();
                        if !tail.is_empty() {
                            out.push_str(" . ");
                            out.push_str(&disassemble_atom(&tail));
                        }
                        break;
                    }
                }
            }
            out.push(')');
        }
        _ => out.push_str(&disassemble_atom(&a.atom(node).to_vec())),
    }
}

fn disassemble_atom(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "()".to_string();
    }
    if bytes.len() > 2 {
        if bytes.iter().all(|b| b.is_ascii_graphic() && *b != b'\'' && *b != b'"' && *b != b';') {
            return format!("'{}'", String::from_utf8_lossy(bytes));
        }
        return format!("0x{}", hex::encode(bytes));
    }
    // Only minimal encodings print as integers; `0x00` would otherwise come back as nil.
    match bytes_to_int(bytes) {
        Some(n) if int_to_bytes(n) == bytes => n.to_string(),
        _ => format!("0x{}", hex::encode(bytes)),
    }
}

fn keyword_opcode(symbol: &str) -> Option<u8> {
    if symbol == "." {
        return None;
    }
    KEYWORDS.iter().position(|k| *k == symbol).map(|i| i as u8)
}

#[derive(Debug, PartialEq)]
enum Token {
    Open,
    Close,
    Dot,
    Atom(Vec<u8>),
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            ';' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '(' => { tokens.push(Token::Open); i += 1; }
            ')' => { tokens.push(Token::Close); i += 1; }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(Error::encoding("program text", "unterminated quoted string"));
                }
                let s: String = chars[start..end].iter().collect();
                tokens.push(Token::Atom(s.into_bytes()));
                i = end + 1;
            }
            _ => {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '(' | ')' | ';') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word == "." {
                    tokens.push(Token::Dot);
                } else {
                    tokens.push(Token::Atom(assemble_word(&word)?));
                }
            }
        }
    }
    Ok(tokens)
}

fn assemble_word(word: &str) -> Result<Vec<u8>> {
    if let Some(digits) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        let padded = if digits.len() % 2 == 1 { format!("0{}", digits) } else { digits.to_string() };
        return hex::decode(&padded).map_err(|e| Error::encoding(format!("hex atom {}", word), e));
    }
    let looks_numeric = {
        let body = word.strip_prefix('-').unwrap_or(word);
        !body.is_empty() && body.chars().all(|c| c.is_ascii_digit())
    };
    if looks_numeric {
        let n: i128 = word.parse().map_err(|e| Error::encoding(format!("integer atom {}", word), e))?;
        return Ok(int_to_bytes(n));
    }
    if let Some(op) = keyword_opcode(word) {
        return Ok(int_to_bytes(op as i128));
    }
    Ok(word.as_bytes().to_vec())
}

fn parse_expr(a: &mut Allocator, tokens: &[Token], pos: &mut usize) -> Result<NodePtr> {
    match tokens.get(*pos) {
        None => Err(Error::encoding("program text", "empty input")),
        Some(Token::Atom(bytes)) => {
            *pos += 1;
            a.new_atom(bytes).map_err(alloc_err)
        }
        Some(Token::Open) => {
            *pos += 1;
            parse_list_tail(a, tokens, pos)
        }
        Some(Token::Close) => Err(Error::encoding("program text", "unexpected `)`")),
        Some(Token::Dot) => Err(Error::encoding("program text", "unexpected `.`")),
    }
}

fn parse_list_tail(a: &mut Allocator, tokens: &[Token], pos: &mut usize) -> Result<NodePtr> {
    let mut items = Vec::new();
    let tail = loop {
        match tokens.get(*pos) {
            None => return Err(Error::encoding("program text", "missing `)`")),
            Some(Token::Close) => {
                *pos += 1;
                break a.nil();
            }
            Some(Token::Dot) => {
                if items.is_empty() {
                    return Err(Error::encoding("program text", "dotted pair without head"));
                }
                *pos += 1;
                let tail = parse_expr(a, tokens, pos)?;
                if tokens.get(*pos) != Some(&Token::Close) {
                    return Err(Error::encoding("program text", "expected `)` after dotted tail"));
                }
                *pos += 1;
                break tail;
            }
            Some(_) => items.push(parse_expr(a, tokens, pos)?),
        }
    };
    items
        .into_iter()
        .rev()
        .try_fold(tail, |acc, item| a.new_pair(item, acc).map_err(alloc_err))
}
