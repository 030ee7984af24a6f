use serde::Serialize;
use std::io::{BufRead, Seek, SeekFrom};

use crate::error::{AuditError, Result};
use crate::storage::AuditSource;

/// 行对齐的半开字节区间 `[start, end)`，分配给一个 worker。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub id: usize,
    pub start: u64,
    pub end: u64,
}

impl Chunk {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 按并行度切分文件（类 Spark 的 input split）。
///
/// 每个内部边界先落在 `start + file_size / P`，再推进到下一个换行符之后，
/// 所以边界永远不会切开一行。目标偏移越过文件尾时提前停止，分片数 ≤ P。
pub fn plan_chunks(source: &AuditSource, parallelism: usize) -> Result<Vec<Chunk>> {
    let mut reader = source.reader()?;
    plan_chunks_in(&mut reader, source.len(), parallelism)
        .map_err(|e| AuditError::io_read(source.path(), e))
}

pub fn plan_chunks_in<R: BufRead + Seek>(
    reader: &mut R,
    file_size: u64,
    parallelism: usize,
) -> std::io::Result<Vec<Chunk>> {
    let parallelism = parallelism.max(1);
    let target_size = file_size / parallelism as u64;
    let mut chunks = Vec::with_capacity(parallelism);
    let mut line = Vec::new();

    let mut start = 0u64;
    for _ in 0..parallelism - 1 {
        let target = start + target_size;
        if target >= file_size {
            break;
        }
        reader.seek(SeekFrom::Start(target))?;
        line.clear();
        // 吃掉目标偏移所在行的剩余部分（含 '\n'）；无结尾换行时读到 EOF
        let consumed = reader.read_until(b'\n', &mut line)? as u64;
        let end = target + consumed;
        chunks.push(Chunk {
            id: chunks.len(),
            start,
            end,
        });
        start = end;
    }

    if start < file_size || chunks.is_empty() {
        chunks.push(Chunk {
            id: chunks.len(),
            start,
            end: file_size,
        });
    }
    Ok(chunks)
}
