//! VRML 1.0 / 2.0 geometry reader.
//!
//! CAD packages export parts as `.wrl` files made of `IndexedFaceSet` nodes.
//! Only the geometry is read: the `point` list of the active `Coordinate`
//! (VRML 2.0) or `Coordinate3` (VRML 1.0) node and the `coordIndex` list of
//! each face set. Appearance, normals, texture coordinates and nested
//! transforms are skipped.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1},
    character::complete::{anychar, char, multispace1, none_of, not_line_ending},
    combinator::{map, recognize, value},
    multi::{many0, many0_count},
    sequence::{delimited, pair, preceded},
    IResult,
};
use nalgebra::Point3;

use crate::geometry::{Mesh, Triangle, Vertex};
use crate::MeshError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrmlVersion {
    V1,
    V2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'a> {
    Open,
    Close,
    OpenList,
    CloseList,
    Str,
    Number(f64),
    Word(&'a str),
}

/// Reads the `#VRML V1.0` / `#VRML V2.0` header line.
pub fn detect_version(input: &str) -> Option<VrmlVersion> {
    let header = input.trim_start().lines().next()?;
    if header.starts_with("#VRML V1.") {
        Some(VrmlVersion::V1)
    } else if header.starts_with("#VRML V2.") {
        Some(VrmlVersion::V2)
    } else {
        None
    }
}

/// Parse every indexed face set in a VRML file into one triangle mesh.
///
/// Polygons are fan-triangulated. Faces that reference a missing coordinate
/// are dropped with a warning.
pub fn parse_vrml(input: &str) -> Result<Mesh, MeshError> {
    let version = detect_version(input).ok_or(MeshError::Syntax {
        format: "VRML",
        message: "missing #VRML header".to_string(),
    })?;
    let tokens = tokenize(input)?;

    let mut mesh = Mesh::new();
    let mut nodes: Vec<&str> = Vec::new();
    let mut last_word = "";
    let mut points: Vec<Point3<f32>> = Vec::new();
    let mut indices: Vec<i64> = Vec::new();
    // Coordinates in scope when each open Separator began.
    let mut saved_points: Vec<Vec<Point3<f32>>> = Vec::new();

    let mut cursor = tokens.iter().copied().peekable();
    while let Some(token) = cursor.next() {
        match token {
            Token::Word(field @ ("point" | "coordIndex"))
                if cursor.peek() == Some(&Token::OpenList) =>
            {
                cursor.next();
                let numbers = read_number_list(&mut cursor)?;
                let parent = nodes.last().copied().unwrap_or_default();
                match (field, parent) {
                    ("point", "Coordinate" | "Coordinate3") => {
                        points = numbers
                            .chunks_exact(3)
                            .map(|c| Point3::new(c[0] as f32, c[1] as f32, c[2] as f32))
                            .collect();
                    }
                    ("coordIndex", "IndexedFaceSet") => {
                        indices = numbers.iter().map(|&n| n as i64).collect();
                    }
                    _ => {}
                }
            }
            Token::Word(word) => last_word = word,
            Token::Number(_) | Token::Str => {}
            Token::Open => {
                nodes.push(last_word);
                if last_word == "Separator" {
                    saved_points.push(points.clone());
                } else if last_word == "IndexedFaceSet" {
                    indices.clear();
                    // VRML 2.0 face sets own their coordinates; VRML 1.0
                    // inherits the last Coordinate3 in scope.
                    if version == VrmlVersion::V2 {
                        points.clear();
                    }
                }
                last_word = "";
            }
            Token::Close => match nodes.pop() {
                Some("IndexedFaceSet") => {
                    append_faces(&mut mesh, &points, &indices);
                    indices.clear();
                }
                Some("Separator") => {
                    if let Some(outer) = saved_points.pop() {
                        points = outer;
                    }
                }
                _ => {}
            },
            Token::OpenList | Token::CloseList => {}
        }
    }

    Ok(mesh)
}

fn read_number_list<'a, I>(cursor: &mut I) -> Result<Vec<f64>, MeshError>
where
    I: Iterator<Item = Token<'a>>,
{
    let mut numbers = Vec::new();
    for token in cursor {
        match token {
            Token::Number(n) => numbers.push(n),
            Token::CloseList => return Ok(numbers),
            other => {
                return Err(MeshError::Syntax {
                    format: "VRML",
                    message: format!("unexpected {other:?} in numeric list"),
                })
            }
        }
    }
    Err(MeshError::Truncated("VRML numeric list"))
}

fn append_faces(mesh: &mut Mesh, points: &[Point3<f32>], indices: &[i64]) {
    let mut dropped = 0usize;
    for face in indices.split(|&i| i < 0).filter(|f| f.len() >= 3) {
        let corners: Option<Vec<Vertex>> = face
            .iter()
            .map(|&i| points.get(i as usize).copied().map(Vertex::at))
            .collect();
        let Some(corners) = corners else {
            dropped += 1;
            continue;
        };

        for pair in corners[1..].windows(2) {
            let mut triangle = Triangle::new(corners[0], pair[0], pair[1]);
            let normal = triangle.calculate_normal();
            for vertex in &mut triangle.vertices {
                vertex.normal = normal;
            }
            mesh.add_triangle(triangle);
        }
    }

    if dropped > 0 {
        log::warn!("Dropped {dropped} VRML faces with out-of-range coordinate indices");
    }
}

fn tokenize(input: &str) -> Result<Vec<Token<'_>>, MeshError> {
    let (rest, tokens) = many0(token)(input).map_err(|e| syntax_error(input, e))?;
    let (rest, _) = skip_ignored(rest).map_err(|e| syntax_error(input, e))?;
    if !rest.is_empty() {
        return Err(MeshError::Syntax {
            format: "VRML",
            message: format!("unexpected input at byte {}", input.len() - rest.len()),
        });
    }
    Ok(tokens)
}

fn syntax_error(input: &str, err: nom::Err<nom::error::Error<&str>>) -> MeshError {
    MeshError::Syntax {
        format: "VRML",
        message: crate::describe_nom_error(input, err),
    }
}

/// Whitespace, commas and `#` comments (the header line included).
fn skip_ignored(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0_count(alt((
            multispace1,
            tag(","),
            recognize(pair(char('#'), not_line_ending)),
        ))),
    )(input)
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    preceded(
        skip_ignored,
        alt((
            value(Token::Open, char('{')),
            value(Token::Close, char('}')),
            value(Token::OpenList, char('[')),
            value(Token::CloseList, char(']')),
            value(
                Token::Str,
                delimited(
                    char('"'),
                    many0_count(alt((preceded(char('\\'), anychar), none_of("\\\"")))),
                    char('"'),
                ),
            ),
            map(take_till1(is_delimiter), classify_word),
        )),
    )(input)
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '[' | ']' | ',' | '"' | '#')
}

fn classify_word(word: &str) -> Token<'_> {
    let numeric = word
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'));
    match word.parse::<f64>() {
        Ok(n) if numeric => Token::Number(n),
        _ => Token::Word(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VRML2_QUAD: &str = r#"#VRML V2.0 utf8
# exported part
Transform {
  children [
    Shape {
      appearance Appearance { material Material { diffuseColor 0.5 0.5 0.5 } }
      geometry DEF face IndexedFaceSet {
        coordIndex [ 0, 1, 2, 3, -1 ]
        coord Coordinate {
          point [ 0 0 0, 1 0 0, 1 1 0, 0 1 0 ]
        }
        texCoord TextureCoordinate { point [ 0 0, 1 0, 1 1, 0 1 ] }
      }
    }
  ]
}
"#;

    const VRML1_TWO_SETS: &str = "#VRML V1.0 ascii
Separator {
  Info { string \"made by \\\"cad\\\"\" }
  Coordinate3 { point [ 0 0 0, 1 0 0, 0 1 0, 0 0 1 ] }
  IndexedFaceSet { coordIndex [ 0, 1, 2, -1 ] }
  IndexedFaceSet { coordIndex [ 0, 1, 3, -1, 0, 2, 9, -1 ] }
}
";

    #[test]
    fn test_detect_version() {
        assert_eq!(detect_version(VRML2_QUAD), Some(VrmlVersion::V2));
        assert_eq!(detect_version(VRML1_TWO_SETS), Some(VrmlVersion::V1));
        assert_eq!(detect_version("solid x"), None);
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = parse_vrml(VRML2_QUAD).unwrap();
        assert_eq!(mesh.triangle_count(), 2);

        let second = &mesh.triangles[1];
        assert_eq!(second.vertices[0].position, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(second.vertices[2].position, Point3::new(0.0, 1.0, 0.0));
        assert_eq!(second.vertices[0].normal.z, 1.0);
    }

    #[test]
    fn test_texture_points_are_not_coordinates() {
        // The 2D texture list would otherwise replace the coordinates.
        let mesh = parse_vrml(VRML2_QUAD).unwrap();
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_vrml1_shares_coordinates_and_drops_bad_faces() {
        let mesh = parse_vrml(VRML1_TWO_SETS).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_vrml1_coordinates_end_with_their_separator() {
        let input = "#VRML V1.0 ascii
Separator {
  Separator {
    Coordinate3 { point [ 0 0 0, 1 0 0, 0 1 0 ] }
    IndexedFaceSet { coordIndex [ 0, 1, 2, -1 ] }
  }
  IndexedFaceSet { coordIndex [ 0, 1, 2, -1 ] }
}
";
        let mesh = parse_vrml(input).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_missing_header_is_rejected() {
        assert!(matches!(
            parse_vrml("Shape {}"),
            Err(MeshError::Syntax { format: "VRML", .. })
        ));
    }

    #[test]
    fn test_unterminated_list_is_truncated() {
        let input = "#VRML V2.0 utf8\nIndexedFaceSet { coord Coordinate { point [ 0 0 0";
        assert!(matches!(parse_vrml(input), Err(MeshError::Truncated(_))));
    }
}
