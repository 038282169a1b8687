//! STL file parser for binary and ASCII formats

use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending, space0},
    combinator::opt,
    multi::many0,
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::geometry::{Mesh, Triangle, Vertex};
use crate::MeshError;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, MeshError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(MeshError::Truncated("binary STL header"));
    }

    // Skip 80-byte header
    let data = &data[HEADER_LEN..];
    let triangle_count = read_u32(data, 0) as usize;
    let body = &data[4..];

    if body.len() < triangle_count.saturating_mul(FACET_LEN) {
        return Err(MeshError::Truncated("binary STL facets"));
    }

    let mut mesh = Mesh::with_capacity(triangle_count);
    for facet in body.chunks_exact(FACET_LEN).take(triangle_count) {
        let [nx, ny, nz] = read_vec3(facet, 0);
        let vertex = |offset| {
            let [x, y, z] = read_vec3(facet, offset);
            Vertex::new(x, y, z, nx, ny, nz)
        };
        // Trailing 2-byte attribute count is ignored.
        mesh.add_triangle(Triangle::new(vertex(12), vertex(24), vertex(36)));
    }

    Ok(mesh)
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_vec3(data: &[u8], offset: usize) -> [f32; 3] {
    [0, 4, 8].map(|i| f32::from_bits(read_u32(data, offset + i)))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, MeshError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(MeshError::Syntax {
            format: "ASCII STL",
            message: crate::describe_nom_error(input, e),
        }),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    // Optional name, up to the end of the line
    let (input, _) = preceded(space0, not_line_ending)(input)?;
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = opt(preceded(space0, not_line_ending))(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
///
/// Some exporters write binary files whose header starts with `solid`, so a
/// failed ASCII parse falls through to the binary reader.
pub fn parse_stl(data: &[u8]) -> Result<Mesh, MeshError> {
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}
