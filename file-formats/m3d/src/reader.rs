//! Whitespace-delimited token reader shared by the text format parsers
//!
//! M3D files are a sequence of labels and values separated by arbitrary
//! whitespace. The reader keeps the line number of every token so that
//! schema mismatches can be reported precisely.

use std::str::FromStr;

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::error::{M3dError, Result};

/// A single token and the 1-based line it was found on
#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    line: usize,
    text: &'a str,
}

/// Sequential reader over the tokens of a text document
#[derive(Debug)]
pub(crate) struct TokenReader<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
    last_line: usize,
}

impl<'a> TokenReader<'a> {
    /// Tokenize the whole document up front
    pub fn new(text: &'a str) -> Self {
        let tokens: Vec<Token<'a>> = text
            .lines()
            .enumerate()
            .flat_map(|(index, line)| {
                line.split_whitespace().map(move |text| Token {
                    line: index + 1,
                    text,
                })
            })
            .collect();
        let last_line = text.lines().count().max(1);

        Self {
            tokens,
            position: 0,
            last_line,
        }
    }

    /// Line of the next token, or the last line when exhausted
    pub fn line(&self) -> usize {
        self.tokens
            .get(self.position)
            .map_or(self.last_line, |token| token.line)
    }

    /// True once every token has been consumed
    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Build a format error pointing at the current position
    pub fn error(&self, message: impl Into<String>) -> M3dError {
        M3dError::MalformedFormat {
            line: self.line(),
            message: message.into(),
        }
    }

    /// Consume the next token
    pub fn next_token(&mut self, what: &str) -> Result<&'a str> {
        match self.tokens.get(self.position) {
            Some(token) => {
                self.position += 1;
                Ok(token.text)
            }
            None => Err(self.error(format!("unexpected end of file while reading {what}"))),
        }
    }

    /// Consume the next token and require it to equal `expected`
    pub fn expect(&mut self, expected: &str) -> Result<()> {
        let line = self.line();
        let found = self.next_token(&format!("'{expected}'"))?;
        if found == expected {
            Ok(())
        } else {
            Err(M3dError::MalformedFormat {
                line,
                message: format!("expected '{expected}', found '{found}'"),
            })
        }
    }

    /// Consume a label of the form `<prefix><index><suffix>`, e.g. `Bone3` or
    /// `ParentIndexOfBone3:`
    pub fn expect_indexed(&mut self, prefix: &str, index: usize, suffix: &str) -> Result<()> {
        self.expect(&format!("{prefix}{index}{suffix}"))
    }

    /// Consume and parse the next token
    pub fn parse<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let line = self.line();
        let text = self.next_token(what)?;
        text.parse().map_err(|_| M3dError::MalformedFormat {
            line,
            message: format!("invalid {what}: '{text}'"),
        })
    }

    /// Consume `label` and parse the value that follows it
    pub fn labeled<T: FromStr>(&mut self, label: &str) -> Result<T> {
        self.expect(label)?;
        self.parse(label)
    }

    /// Read `N` consecutive floats
    pub fn floats<const N: usize>(&mut self, what: &str) -> Result<[f32; N]> {
        let mut values = [0.0f32; N];
        for value in &mut values {
            *value = self.parse(what)?;
        }
        Ok(values)
    }

    pub fn vec2(&mut self, what: &str) -> Result<Vec2> {
        Ok(Vec2::from_array(self.floats::<2>(what)?))
    }

    pub fn vec3(&mut self, what: &str) -> Result<Vec3> {
        Ok(Vec3::from_array(self.floats::<3>(what)?))
    }

    pub fn vec4(&mut self, what: &str) -> Result<Vec4> {
        Ok(Vec4::from_array(self.floats::<4>(what)?))
    }

    /// Read a quaternion stored as `x y z w`
    pub fn quat(&mut self, what: &str) -> Result<Quat> {
        let [x, y, z, w] = self.floats::<4>(what)?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }

    /// Read 16 floats written row by row for row vectors.
    ///
    /// Row-major storage of a row-vector matrix is the same memory layout as
    /// column-major storage of the equivalent column-vector matrix.
    pub fn mat4(&mut self, what: &str) -> Result<Mat4> {
        Ok(Mat4::from_cols_array(&self.floats::<16>(what)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_track_lines() {
        let mut reader = TokenReader::new("#Bones 3\n\n  #AnimationClips   1\n");
        assert_eq!(reader.line(), 1);
        assert_eq!(reader.labeled::<usize>("#Bones").unwrap(), 3);
        assert_eq!(reader.line(), 3);
        assert_eq!(reader.labeled::<usize>("#AnimationClips").unwrap(), 1);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_label_mismatch_reports_line() {
        let mut reader = TokenReader::new("Position: 1 2 3\nNormal: 0 1 0");
        reader.expect("Position:").unwrap();
        reader.vec3("position").unwrap();
        let err = reader.expect("Tangent:").unwrap_err();
        match err {
            M3dError::MalformedFormat { line, message } => {
                assert_eq!(line, 2);
                assert_eq!(message, "expected 'Tangent:', found 'Normal:'");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_number() {
        let mut reader = TokenReader::new("Roughness: rough");
        let err = reader.labeled::<f32>("Roughness:").unwrap_err();
        assert!(err.to_string().contains("invalid Roughness:"));
    }

    #[test]
    fn test_unexpected_eof() {
        let mut reader = TokenReader::new("Time: 0.5");
        reader.labeled::<f32>("Time:").unwrap();
        let err = reader.expect("Pos:").unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn test_indexed_label() {
        let mut reader = TokenReader::new("ParentIndexOfBone7: 3");
        reader.expect_indexed("ParentIndexOfBone", 7, ":").unwrap();
        assert_eq!(reader.parse::<i32>("parent index").unwrap(), 3);
    }

    #[test]
    fn test_mat4_layout() {
        let text = "1 0 0 0 0 1 0 0 0 0 1 0 4 5 6 1";
        let mut reader = TokenReader::new(text);
        let m = reader.mat4("offset").unwrap();
        assert_eq!(m.w_axis, Vec4::new(4.0, 5.0, 6.0, 1.0));
        assert_eq!(m.transform_point3(Vec3::ZERO), Vec3::new(4.0, 5.0, 6.0));
    }
}
