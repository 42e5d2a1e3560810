//! SOUNDEX and DIFFERENCE

use crate::error::Result;
use crate::types::Value;

fn code(c: char) -> Option<char> {
    Some(match c {
        'B' | 'F' | 'P' | 'V' => '1',
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => '2',
        'D' | 'T' => '3',
        'L' => '4',
        'M' | 'N' => '5',
        'R' => '6',
        _ => return None,
    })
}

/// American Soundex: the first letter followed by three digits. Letters
/// separated by H or W share a code; vowels break a run. Empty when the text
/// holds no letters.
pub(super) fn soundex(text: &str) -> String {
    let mut letters = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase());
    let Some(first) = letters.next() else {
        return String::new();
    };
    let mut result = String::from(first);
    let mut last = code(first);
    for c in letters {
        if result.len() == 4 {
            break;
        }
        match code(c) {
            Some(digit) if Some(digit) != last => {
                result.push(digit);
                last = Some(digit);
            }
            Some(_) => {}
            None if c == 'H' || c == 'W' => {}
            None => last = None,
        }
    }
    while result.len() < 4 {
        result.push('0');
    }
    result
}

pub(super) fn soundex_value(value: &Value) -> Result<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        other => Value::Str(soundex(&other.to_string())),
    })
}

/// The number of matching positions of two Soundex codes, 0 to 4.
pub(super) fn difference(left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let (a, b) = (soundex(&left.to_string()), soundex(&right.to_string()));
    let matching = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    Ok(Value::I32(matching as i32))
}
