//! STL 读取

use super::{
    probe_format, MeshCreator, SolidInfos, StlFormat, Triangle, BINARY_FACET_SIZE,
    BINARY_HEADER_SIZE,
};
use crate::error::{Error, Result};
use crate::task::TaskIface;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

/// 每处理这么多个三角形（或文本行）检查一次停止请求并报告进度
const TASK_CHECK_INTERVAL: u64 = 512;

/// 读取选项
pub struct ReadOptions<'a, C: ?Sized> {
    /// 指定格式，`None` 时从流内容探测
    pub format: Option<StlFormat>,
    pub task: TaskIface<'a, C>,
}

impl<C: ?Sized> Default for ReadOptions<'_, C> {
    fn default() -> Self {
        Self {
            format: None,
            task: TaskIface::default(),
        }
    }
}

/// 从流的当前位置读取一个实体
///
/// 成功后流位置停在该实体之后，可继续读取下一个实体。
pub fn read<R, M, C>(stream: &mut R, creator: &mut M, options: &ReadOptions<'_, C>) -> Result<()>
where
    R: Read + Seek,
    M: MeshCreator + ?Sized,
    C: ?Sized,
{
    let format = match options.format {
        Some(format) if format != StlFormat::Unknown => format,
        _ => probe_entry(stream)?,
    };
    match format {
        StlFormat::Ascii => read_ascii(stream, creator, &options.task),
        StlFormat::BinaryLe => read_binary::<LittleEndian, _, _, _>(stream, creator, format, &options.task),
        StlFormat::BinaryBe => read_binary::<BigEndian, _, _, _>(stream, creator, format, &options.task),
        StlFormat::Unknown => Err(Error::StlUnknownFormat),
    }
}

/// 流中当前位置之后是否还有非空白数据，不移动流位置
///
/// 二进制实体的头可能以空白开头，跳过空白会破坏对齐，所以空白留给文本读取自行处理。
pub fn has_remaining_data<R: Read + Seek>(stream: &mut R) -> Result<bool> {
    let start = stream.stream_position()?;
    let found = {
        let mut reader = BufReader::new(&mut *stream);
        loop {
            let buffer = reader.fill_buf()?;
            if buffer.is_empty() {
                break false;
            }
            if buffer.iter().any(|b| !b.is_ascii_whitespace()) {
                break true;
            }
            let len = buffer.len();
            reader.consume(len);
        }
    };
    stream.seek(SeekFrom::Start(start))?;
    Ok(found)
}

/// 单个实体的格式：整流探测失败时，按小端二进制头声明的三角形数能否放下判断
fn probe_entry<R: Read + Seek>(stream: &mut R) -> Result<StlFormat> {
    let format = probe_format(stream)?;
    if format != StlFormat::Unknown {
        return Ok(format);
    }

    let start = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(start))?;
    if end - start < BINARY_HEADER_SIZE {
        return Ok(StlFormat::Unknown);
    }
    let mut head = [0u8; BINARY_HEADER_SIZE as usize];
    stream.read_exact(&mut head)?;
    stream.seek(SeekFrom::Start(start))?;
    let count = LittleEndian::read_u32(&head[80..84]);
    if BINARY_HEADER_SIZE + BINARY_FACET_SIZE * u64::from(count) <= end - start {
        Ok(StlFormat::BinaryLe)
    } else {
        Ok(StlFormat::Unknown)
    }
}

fn read_binary<B, R, M, C>(
    stream: &mut R,
    creator: &mut M,
    format: StlFormat,
    task: &TaskIface<'_, C>,
) -> Result<()>
where
    B: ByteOrder,
    R: Read + Seek,
    M: MeshCreator + ?Sized,
    C: ?Sized,
{
    let start = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(start))?;
    let remaining = end - start;
    if remaining < BINARY_HEADER_SIZE {
        return Err(Error::StlHeaderWrongSize);
    }

    let mut header = [0u8; 80];
    stream.read_exact(&mut header)?;
    let count = stream.read_u32::<B>()?;
    let available = (remaining - BINARY_HEADER_SIZE) / BINARY_FACET_SIZE;
    if u64::from(count) > available {
        return Err(Error::StlFacetCount {
            announced: count,
            available,
        });
    }

    let solid_name = String::from_utf8_lossy(&header)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string();
    creator.begin_solid(&SolidInfos {
        format,
        solid_name,
        facet_count: Some(count),
    });

    {
        let mut reader = BufReader::new(&mut *stream);
        for index in 0..count {
            if u64::from(index) % TASK_CHECK_INTERVAL == 0 {
                if task.is_stop_requested() {
                    return Err(Error::TaskStopped);
                }
                task.handle_progress(u64::from(index), u64::from(count));
            }
            let triangle = Triangle {
                n: read_vec::<B>(&mut reader)?,
                v1: read_vec::<B>(&mut reader)?,
                v2: read_vec::<B>(&mut reader)?,
                v3: read_vec::<B>(&mut reader)?,
                attribute_byte_count: reader.read_u16::<B>()?,
            };
            creator.add_triangle(index, &triangle);
        }
    }

    stream.seek(SeekFrom::Start(
        start + BINARY_HEADER_SIZE + BINARY_FACET_SIZE * u64::from(count),
    ))?;
    creator.end_solid();
    task.handle_progress(u64::from(count), u64::from(count));
    Ok(())
}

fn read_vec<B: ByteOrder>(reader: &mut impl Read) -> std::io::Result<[f32; 3]> {
    Ok([reader.read_f32::<B>()?, reader.read_f32::<B>()?, reader.read_f32::<B>()?])
}

#[derive(Clone, Copy)]
enum Slot {
    Keyword(&'static str),
    /// (向量序号，分量)：0 为法向量，1..=3 为顶点
    Coord(usize, usize),
}

use Slot::{Coord, Keyword};

/// 一个文本三角形记录的记号序列
const FACET_LAYOUT: [Slot; 21] = [
    Keyword("facet"),
    Keyword("normal"),
    Coord(0, 0),
    Coord(0, 1),
    Coord(0, 2),
    Keyword("outer"),
    Keyword("loop"),
    Keyword("vertex"),
    Coord(1, 0),
    Coord(1, 1),
    Coord(1, 2),
    Keyword("vertex"),
    Coord(2, 0),
    Coord(2, 1),
    Coord(2, 2),
    Keyword("vertex"),
    Coord(3, 0),
    Coord(3, 1),
    Coord(3, 2),
    Keyword("endloop"),
    Keyword("endfacet"),
];

enum Token {
    Pending,
    Facet(Triangle),
    EndSolid,
}

#[derive(Default)]
struct FacetParser {
    slot: usize,
    vectors: [[f32; 3]; 4],
}

impl FacetParser {
    fn token(&mut self, word: &str, line: usize) -> Result<Token> {
        if self.slot == 0 && word.eq_ignore_ascii_case("endsolid") {
            return Ok(Token::EndSolid);
        }
        match FACET_LAYOUT[self.slot] {
            Keyword(keyword) => {
                if !word.eq_ignore_ascii_case(keyword) {
                    return Err(Error::parsing(line, format!("expected '{keyword}', found '{word}'")));
                }
            }
            Coord(vector, axis) => {
                self.vectors[vector][axis] = word
                    .parse()
                    .map_err(|_| Error::parsing(line, format!("invalid number '{word}'")))?;
            }
        }
        self.slot += 1;
        if self.slot < FACET_LAYOUT.len() {
            return Ok(Token::Pending);
        }
        self.slot = 0;
        let [n, v1, v2, v3] = self.vectors;
        Ok(Token::Facet(Triangle {
            n,
            v1,
            v2,
            v3,
            attribute_byte_count: 0,
        }))
    }
}

fn read_ascii<R, M, C>(stream: &mut R, creator: &mut M, task: &TaskIface<'_, C>) -> Result<()>
where
    R: Read + Seek,
    M: MeshCreator + ?Sized,
    C: ?Sized,
{
    let start = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(start))?;
    let total = end - start;

    let mut consumed = 0u64;
    {
        let mut reader = BufReader::new(&mut *stream);
        let mut buffer = Vec::new();
        let mut line_no = 0usize;
        let mut started = false;
        let mut parser = FacetParser::default();
        let mut index = 0u32;

        'lines: loop {
            buffer.clear();
            let n = reader.read_until(b'\n', &mut buffer)?;
            if n == 0 {
                return Err(Error::parsing(line_no, "unexpected end of stream"));
            }
            consumed += n as u64;
            line_no += 1;
            if line_no as u64 % TASK_CHECK_INTERVAL == 0 {
                if task.is_stop_requested() {
                    return Err(Error::TaskStopped);
                }
                task.handle_progress(consumed, total);
            }

            let line = String::from_utf8_lossy(&buffer);
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            if !started {
                let keyword = text.get(..5).unwrap_or(text);
                let name = text.get(5..).unwrap_or_default();
                if !keyword.eq_ignore_ascii_case("solid") {
                    return Err(Error::parsing(line_no, "expected 'solid'"));
                }
                creator.begin_solid(&SolidInfos {
                    format: StlFormat::Ascii,
                    solid_name: name.trim().to_string(),
                    facet_count: None,
                });
                started = true;
                continue;
            }

            for word in text.split_whitespace() {
                match parser.token(word, line_no)? {
                    Token::Pending => {}
                    Token::Facet(triangle) => {
                        creator.add_triangle(index, &triangle);
                        index += 1;
                    }
                    Token::EndSolid => break 'lines,
                }
            }
        }
    }

    stream.seek(SeekFrom::Start(start + consumed))?;
    creator.end_solid();
    task.handle_progress(total, total);
    Ok(())
}
