//! Transaction builder: owns the operation lines of one in-progress document
//!
//! Every mutating call runs its gates first, mutates the document only when
//! they pass, and then writes the whole document back to the session store so
//! leaving and re-entering a screen reconstructs the same state.

use std::collections::HashSet;

use rand::Rng;
use rust_decimal::Decimal;

use crate::error::{SessionError, ValidationError, WizardError, WizardResult};
use crate::models::{
    Allocation, Document, LicensePlateNumber, OperationLine, StockRecord, SubmissionLine,
    SubmissionOutcome, SubmissionPayload, SELECTION_PREFIX,
};
use crate::remote::RemoteDataService;
use crate::residual::{ResidualQuantity, ResidualQuantityCalculator};
use crate::serial::SerialRange;
use crate::session::{discard_document, load_or_init, save_document, LoadOutcome, SessionStore};
use crate::types::{StockId, WizardKind};
use crate::validation::{
    validate_conversion_factor, validate_destination, validate_mandatory_destination,
    validate_quantity, validate_serial_allocation, validate_serial_quantity,
    validate_serial_range, validate_stock_sequence,
};

/// Last mutation, kept so a cancel can revert it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    LineCreated { stock_id: StockId, operation: u32 },
    AllocationAdded { stock_id: StockId, operation: u32 },
}

/// State machine over one wizard's document
pub struct TransactionBuilder<S: SessionStore> {
    kind: WizardKind,
    store: S,
    document: Document,
    residuals: ResidualQuantityCalculator,
    last_change: Option<Change>,
}

impl<S: SessionStore> TransactionBuilder<S> {
    /// Resume the stored document of `kind`, or start a fresh one
    pub fn open(
        mut store: S,
        kind: WizardKind,
        username: &str,
    ) -> Result<(Self, LoadOutcome), SessionError> {
        let (document, outcome) = load_or_init(&mut store, kind, username)?;
        Ok((Self::new(store, kind, document), outcome))
    }

    /// Wrap an already loaded document
    pub fn new(store: S, kind: WizardKind, document: Document) -> Self {
        Self {
            kind,
            store,
            document,
            residuals: ResidualQuantityCalculator::new(),
            last_change: None,
        }
    }

    pub fn kind(&self) -> WizardKind {
        self.kind
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn current_operation(&self) -> u32 {
        self.document.current_operation
    }

    pub fn current_line(&self) -> Option<&OperationLine> {
        self.document.current_line()
    }

    /// Line of `stock_id` in the current operation
    pub fn line(&self, stock_id: StockId) -> Option<&OperationLine> {
        self.document.find_line(stock_id, self.document.current_operation)
    }

    /// Card total of a stock record in the current operation
    pub fn line_total(&self, stock_id: StockId) -> Decimal {
        self.line(stock_id)
            .map(OperationLine::allocated_quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Residual of a stock record for the current operation
    pub fn residual(&mut self, record: &StockRecord) -> ResidualQuantity {
        self.residuals.compute(
            record,
            self.document.lines(),
            self.document.current_operation,
        )
    }

    // ========================================================================
    // Header
    // ========================================================================

    pub fn set_stock_site(&mut self, site: impl Into<String>) -> Result<(), SessionError> {
        self.document.header.stock_site = Some(site.into());
        self.save()
    }

    pub fn set_effective_date(&mut self, date: chrono::NaiveDate) -> Result<(), SessionError> {
        self.document.header.effective_date = Some(date);
        self.save()
    }

    pub fn set_operation_mode(
        &mut self,
        mode: crate::types::LicensePlateNumberOperationMode,
    ) -> Result<(), SessionError> {
        self.document.header.license_plate_number_operation_mode = Some(mode);
        self.save()
    }

    /// Echo a user selection needed to resume mid-wizard (`selectedLocation`, ...)
    pub fn remember_selection(
        &mut self,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), SessionError> {
        self.document
            .selections
            .insert(selection_key(name), value);
        self.save()
    }

    pub fn forget_selection(&mut self, name: &str) -> Result<(), SessionError> {
        self.document.selections.remove(&selection_key(name));
        self.save()
    }

    pub fn selection(&self, name: &str) -> Option<&serde_json::Value> {
        self.document.selections.get(&selection_key(name))
    }

    // ========================================================================
    // Line mutations
    // ========================================================================

    /// Make `stock_id` the active line of the current operation, appending an
    /// empty line when it is not there yet. Returns the line's index.
    ///
    /// Callers run the selection gates first (see [`Self::select_checked`]).
    pub fn select(&mut self, stock_id: StockId, product: &str) -> Result<usize, SessionError> {
        let operation = self.document.current_operation;
        let index = match self.document.position(stock_id, operation) {
            Some(index) => {
                tracing::debug!("Reusing line of stock {} in operation {}", stock_id, operation);
                index
            }
            None => {
                tracing::debug!("New line for stock {} in operation {}", stock_id, operation);
                self.document
                    .lines_mut()
                    .push(OperationLine::new(stock_id, operation, product));
                self.last_change = Some(Change::LineCreated {
                    stock_id,
                    operation,
                });
                self.document.lines().len() - 1
            }
        };
        self.document.current_line = Some(index);
        self.document.started = true;
        self.save()?;
        Ok(index)
    }

    /// Run the selection gates for `record`, then select it
    ///
    /// The record must still have quantity left for this operation, the
    /// destination's single-product and single-lot rules must hold, and a
    /// serial-tracked record's serials must be contiguous.
    pub async fn select_checked<R: RemoteDataService + ?Sized>(
        &mut self,
        remote: &R,
        record: &StockRecord,
        destination: Option<&LicensePlateNumber>,
    ) -> WizardResult<usize> {
        self.check_residual(record)?;
        if let Some(destination) = destination {
            validate_destination(remote, destination, &self.document, record).await?;
        }
        validate_stock_sequence(remote, record).await?;
        self.select_record(record)
    }

    /// Select `record` after the in-memory gates only
    ///
    /// Hosts without a remote service run the destination and serial
    /// sequence gates themselves before calling this.
    pub fn select_record(&mut self, record: &StockRecord) -> WizardResult<usize> {
        self.check_residual(record)?;
        let index = self.select(record.stock_id, &record.product)?;
        if record.lot.is_some() || record.stock_site.is_some() {
            if let Some(line) = self.document.lines_mut().get_mut(index) {
                line.lot = record.lot.clone();
                line.stock_site = record.stock_site.clone();
            }
            self.save()?;
        }
        Ok(index)
    }

    /// A record without a line in this operation needs residual quantity left
    fn check_residual(&mut self, record: &StockRecord) -> Result<(), ValidationError> {
        if self.line(record.stock_id).is_some() {
            return Ok(());
        }
        let residual = self.residual(record);
        validate_quantity(record.stock_id, residual.remaining(), &residual)
    }

    /// Validate and append an allocation to the current operation's line of
    /// `record`
    pub fn add_allocation(
        &mut self,
        record: &StockRecord,
        mut allocation: Allocation,
        lot_managed: bool,
    ) -> WizardResult<()> {
        let operation = self.document.current_operation;
        let index = self
            .document
            .position(record.stock_id, operation)
            .ok_or(ValidationError::LineNotSelected {
                stock_id: record.stock_id,
            })?;

        validate_conversion_factor(allocation.packing_unit_to_stock_unit_conversion_factor)?;
        validate_mandatory_destination(self.kind, &allocation, lot_managed)?;
        let residual = self.residual(record);
        validate_quantity(record.stock_id, allocation.quantity_in_packing_unit, &residual)?;
        if record.is_serial_tracked() {
            if allocation.starting_serial().is_none() {
                return Err(ValidationError::SerialNumberMissing {
                    stock_id: record.stock_id,
                }
                .into());
            }
            validate_serial_quantity(allocation.quantity_in_packing_unit)?;
            validate_serial_allocation(&self.document, &record.product, &allocation)?;
        }

        allocation.recompute_stock_quantity();
        if let Some(line) = self.document.lines_mut().get_mut(index) {
            line.stock_details.push(allocation);
            refresh_displayed(line);
        }
        self.document.current_line = Some(index);
        self.last_change = Some(Change::AllocationAdded {
            stock_id: record.stock_id,
            operation,
        });
        tracing::debug!(
            "Allocated on stock {} in operation {}, total {}",
            record.stock_id,
            operation,
            self.line_total(record.stock_id)
        );
        self.save()?;
        Ok(())
    }

    /// Allocate the serial range `start..=end` the user typed on a
    /// serial-tracked record
    ///
    /// `end` must be the ending serial implied by `start` and the allocation's
    /// quantity, and the range must not overlap a range already committed for
    /// the product. The allocation's serial is set to `start`.
    pub fn add_serial_range(
        &mut self,
        record: &StockRecord,
        start: &str,
        end: &str,
        mut allocation: Allocation,
        lot_managed: bool,
    ) -> WizardResult<SerialRange> {
        let range = validate_serial_range(
            &self.document,
            &record.product,
            start.trim(),
            end.trim(),
            allocation.quantity_in_packing_unit,
        )?;
        allocation.serial_number = Some(range.start.clone());
        self.add_allocation(record, allocation, lot_managed)?;
        Ok(range)
    }

    /// Remove the current operation's line of `stock_id` with all its
    /// allocations. Returns whether a line was removed.
    pub fn unselect(&mut self, stock_id: StockId) -> Result<bool, SessionError> {
        let operation = self.document.current_operation;
        let Some(index) = self.document.position(stock_id, operation) else {
            return Ok(false);
        };
        self.remove_line(index);
        self.residuals.invalidate(stock_id);
        tracing::debug!("Unselected stock {} in operation {}", stock_id, operation);
        self.save()?;
        Ok(true)
    }

    /// Remove the first allocation of line `(stock_id, line_number)` matching
    /// `predicate`. The line stays even when it becomes empty.
    pub fn delete_allocation<F>(
        &mut self,
        stock_id: StockId,
        line_number: u32,
        mut predicate: F,
    ) -> Result<Option<Allocation>, SessionError>
    where
        F: FnMut(&Allocation) -> bool,
    {
        let Some(index) = self.document.position(stock_id, line_number) else {
            return Ok(None);
        };
        let removed = match self.document.lines_mut().get_mut(index) {
            Some(line) => {
                let removed = line
                    .stock_details
                    .iter()
                    .position(|a| predicate(a))
                    .map(|position| line.stock_details.remove(position));
                refresh_displayed(line);
                removed
            }
            None => None,
        };
        if removed.is_some() {
            if line_number != self.document.current_operation {
                self.residuals.invalidate(stock_id);
            }
            self.last_change = None;
            self.save()?;
        }
        Ok(removed)
    }

    /// Start the next operation, keeping earlier operations' lines
    pub fn advance_operation(&mut self) -> Result<u32, SessionError> {
        self.document.current_operation += 1;
        self.document.current_line = None;
        self.last_change = None;
        tracing::info!(
            "{} moved to operation {}",
            self.kind,
            self.document.current_operation
        );
        self.save()?;
        Ok(self.document.current_operation)
    }

    /// Undo the most recent select or allocation (cancel action)
    pub fn revert_last(&mut self) -> Result<bool, SessionError> {
        let reverted = match self.last_change.take() {
            Some(Change::LineCreated {
                stock_id,
                operation,
            }) => match self.document.position(stock_id, operation) {
                Some(index) if self.document.lines()[index].is_empty() => {
                    self.remove_line(index);
                    self.residuals.invalidate(stock_id);
                    true
                }
                _ => false,
            },
            Some(Change::AllocationAdded {
                stock_id,
                operation,
            }) => match self.document.position(stock_id, operation) {
                Some(index) => {
                    let line = &mut self.document.lines_mut()[index];
                    let popped = line.stock_details.pop().is_some();
                    refresh_displayed(line);
                    popped
                }
                None => false,
            },
            None => false,
        };
        if reverted {
            tracing::debug!("Reverted last change of {}", self.kind);
            self.save()?;
        }
        Ok(reverted)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Re-derive the UI copies of line totals and write the document
    ///
    /// Calling this twice without a mutation in between writes identical JSON.
    pub fn reconcile(&mut self) -> Result<String, SessionError> {
        for line in self.document.lines_mut() {
            refresh_displayed(line);
        }
        save_document(&mut self.store, self.kind, &self.document)
    }

    fn save(&mut self) -> Result<(), SessionError> {
        self.reconcile().map(|_| ())
    }

    /// Drop the stored document and start over empty
    pub fn discard(&mut self) -> Result<(), SessionError> {
        discard_document(&mut self.store, self.kind)?;
        self.document = Document::new(std::mem::take(&mut self.document.username));
        self.residuals.clear();
        self.last_change = None;
        tracing::info!("Discarded {} document", self.kind);
        Ok(())
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Final payload with fresh line numbers and transient fields stripped
    pub fn flatten(&self) -> SubmissionPayload {
        self.flatten_with(&mut rand::thread_rng())
    }

    /// [`Self::flatten`] drawing line numbers from `rng`
    ///
    /// Lines left empty by deleted allocations are not submitted.
    pub fn flatten_with<G: Rng>(&self, rng: &mut G) -> SubmissionPayload {
        let mut used = HashSet::new();
        let stock_change_lines = self
            .document
            .lines()
            .iter()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let line_number = loop {
                    let candidate: u32 = rng.gen();
                    if used.insert(candidate) {
                        break candidate;
                    }
                };
                SubmissionLine {
                    line_number,
                    stock_id: line.stock_id,
                    product: line.product.clone(),
                    stock_details: line.stock_details.clone(),
                }
            })
            .collect();

        let header = &self.document.header;
        SubmissionPayload {
            id: header.id.clone(),
            stock_site: header.stock_site.clone(),
            effective_date: header.effective_date,
            license_plate_number_operation_mode: header.license_plate_number_operation_mode,
            stock_change_lines,
        }
    }

    /// Submit the document
    ///
    /// A created document is discarded from the session. A rejection or a
    /// transport failure leaves it stored so the user can retry or discard.
    pub async fn submit<R: RemoteDataService + ?Sized>(
        &mut self,
        remote: &R,
    ) -> WizardResult<SubmissionOutcome> {
        let payload = self.flatten();
        tracing::info!(
            "Submitting {} document with {} lines",
            self.kind,
            payload.stock_change_lines.len()
        );

        let response = remote.submit(&payload).await.map_err(|err| {
            tracing::warn!("Submission of {} document failed: {}", self.kind, err);
            WizardError::Transport(err)
        })?;

        let outcome = SubmissionOutcome::from(response);
        match &outcome {
            SubmissionOutcome::Created { id, warnings } => {
                tracing::info!("Created {} ({} warnings)", id, warnings.len());
                self.discard()?;
            }
            SubmissionOutcome::Rejected { diagnoses } => {
                tracing::warn!(
                    "{} document rejected with {} diagnoses",
                    self.kind,
                    diagnoses.len()
                );
            }
        }
        Ok(outcome)
    }

    fn remove_line(&mut self, index: usize) {
        self.document.lines_mut().remove(index);
        self.document.current_line = match self.document.current_line {
            Some(current) if current == index => None,
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
        self.last_change = None;
    }
}

fn refresh_displayed(line: &mut OperationLine) {
    line.displayed_quantity = Some(line.allocated_quantity());
}

fn selection_key(name: &str) -> String {
    if name.starts_with(SELECTION_PREFIX) {
        name.to_string()
    } else {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("{SELECTION_PREFIX}{}{}", first.to_uppercase(), chars.as_str()),
            None => SELECTION_PREFIX.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    #[test]
    fn test_selection_key() {
        assert_eq!(selection_key("location"), "selectedLocation");
        assert_eq!(selection_key("selectedLot"), "selectedLot");
    }

    #[test]
    fn test_select_reuses_existing_line() {
        let (mut builder, _) =
            TransactionBuilder::open(MemorySessionStore::new(), WizardKind::StockChange, "alice")
                .unwrap();
        let first = builder.select(StockId(5), "P1").unwrap();
        let second = builder.select(StockId(5), "P1").unwrap();
        assert_eq!(first, second);
        assert_eq!(builder.document().lines().len(), 1);
    }

    #[test]
    fn test_unselect_moves_current_line() {
        let (mut builder, _) =
            TransactionBuilder::open(MemorySessionStore::new(), WizardKind::StockChange, "alice")
                .unwrap();
        builder.select(StockId(1), "P1").unwrap();
        builder.select(StockId(2), "P1").unwrap();
        assert_eq!(builder.document().current_line, Some(1));
        assert!(builder.unselect(StockId(1)).unwrap());
        assert_eq!(builder.document().current_line, Some(0));
        assert!(!builder.unselect(StockId(1)).unwrap());
    }

    #[test]
    fn test_revert_new_line() {
        let (mut builder, _) =
            TransactionBuilder::open(MemorySessionStore::new(), WizardKind::StockChange, "alice")
                .unwrap();
        builder.select(StockId(1), "P1").unwrap();
        assert!(builder.revert_last().unwrap());
        assert!(builder.document().lines().is_empty());
        assert!(!builder.revert_last().unwrap());
    }
}
