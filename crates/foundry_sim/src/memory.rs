//! A simulated cell memory attached to the memory ports.

use crate::error::SimError;
use crate::state::{PortInputs, PortOutputs};
use foundry_ir::Value;

pub(crate) const CELL_INDEX_PORT: &str = "CellIndex";
pub(crate) const DATA_IN_PORT: &str = "DataIn";
pub(crate) const DATA_OUT_PORT: &str = "DataOut";
pub(crate) const READ_ENABLE_PORT: &str = "ReadEnable";
pub(crate) const WRITE_ENABLE_PORT: &str = "WriteEnable";
pub(crate) const READS_DONE_PORT: &str = "ReadsDone";
pub(crate) const WRITES_DONE_PORT: &str = "WritesDone";

/// Memory of 32-bit cells answering one request per cycle.
///
/// A request seen on the outputs of one edge is answered on the inputs of
/// the next: `DataIn` and `ReadsDone` for a read, `WritesDone` for a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimMemory {
    cells: Vec<u32>,
    reads: u64,
    writes: u64,
}

impl SimMemory {
    /// A memory of `size` zeroed cells.
    pub fn new(size: usize) -> Self {
        Self::from_cells(vec![0; size])
    }

    /// A memory holding `cells`.
    pub fn from_cells(cells: Vec<u32>) -> Self {
        Self {
            cells,
            reads: 0,
            writes: 0,
        }
    }

    /// The cell contents.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// One cell.
    pub fn cell(&self, index: usize) -> Option<u32> {
        self.cells.get(index).copied()
    }

    /// Number of reads answered.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Number of writes answered.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Answers the request on `outputs`, setting the memory inputs of the
    /// next edge.
    pub fn respond(
        &mut self,
        outputs: &PortOutputs,
        inputs: &mut PortInputs,
    ) -> Result<(), SimError> {
        let read = outputs.bool(READ_ENABLE_PORT);
        let write = outputs.bool(WRITE_ENABLE_PORT);
        if read || write {
            let index = outputs.int(CELL_INDEX_PORT);
            let length = self.cells.len();
            let cell = usize::try_from(index)
                .ok()
                .and_then(|i| self.cells.get_mut(i))
                .ok_or(SimError::IndexOutOfRange { index, length })?;
            if read {
                inputs.set(DATA_IN_PORT, Value::int(i128::from(*cell), 32, false));
                self.reads += 1;
            }
            if write {
                *cell = u32::try_from(outputs.int(DATA_OUT_PORT)).unwrap_or_default();
                self.writes += 1;
            }
        }
        inputs.set(READS_DONE_PORT, Value::Bool(read));
        inputs.set(WRITES_DONE_PORT, Value::Bool(write));
        Ok(())
    }
}
