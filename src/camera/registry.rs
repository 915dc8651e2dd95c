//! In-memory slot registry.
//!
//! Synchronous and I/O-free apart from releasing leases. Invariants held
//! after every call:
//! - a slot holds at most one lease
//! - `len() <= max_slots`
//! - under `DeviceReusePolicy::Exclusive`, no two slots share a device
//! - a lease leaving the registry is released before its slot changes

use super::{MediaHost, Presentation, SlotId, SlotView, StreamLease};
use crate::config::{CameraViewConfig, DeviceReusePolicy, FocusPolicy};
use crate::error::{ClassMeetError, ClassMeetResult};

struct ViewSlot<H: MediaHost> {
    id: SlotId,
    label: String,
    lease: Option<StreamLease<H>>,
    presentation: Presentation,
}

impl<H: MediaHost> ViewSlot<H> {
    fn device_id(&self) -> Option<&str> {
        self.lease.as_ref().map(|l| l.device_id())
    }

    fn view(&self) -> SlotView {
        SlotView {
            slot_id: self.id,
            device_id: self.device_id().map(str::to_string),
            label: self.label.clone(),
            presentation: self.presentation,
            streaming: self.lease.is_some(),
        }
    }
}

/// Ordered collection of camera slots, in display order.
pub struct SlotRegistry<H: MediaHost> {
    slots: Vec<ViewSlot<H>>,
    max_slots: usize,
    reuse_policy: DeviceReusePolicy,
    focus_policy: FocusPolicy,
    next_id: u32,
}

impl<H: MediaHost> SlotRegistry<H> {
    pub fn new(config: &CameraViewConfig) -> Self {
        let mut config = config.clone();
        config.validate();
        Self {
            slots: Vec::with_capacity(config.max_slots),
            max_slots: config.max_slots,
            reuse_policy: config.reuse_policy,
            focus_policy: config.focus_policy,
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.max_slots
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn ids(&self) -> Vec<SlotId> {
        self.slots.iter().map(|s| s.id).collect()
    }

    pub fn views(&self) -> Vec<SlotView> {
        self.slots.iter().map(ViewSlot::view).collect()
    }

    pub fn view(&self, id: SlotId) -> Option<SlotView> {
        self.index_of(id).map(|i| self.slots[i].view())
    }

    /// Run `f` against the stream bound to slot `id`, if any.
    pub fn with_stream<R>(&self, id: SlotId, f: impl FnOnce(&H::Stream) -> R) -> Option<R> {
        let slot = &self.slots[self.index_of(id)?];
        slot.lease.as_ref().and_then(|l| l.stream()).map(f)
    }

    /// Devices currently bound, in slot order.
    pub fn devices_in_use(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter_map(|s| s.device_id().map(str::to_string))
            .collect()
    }

    /// Leases currently held.
    pub fn live_stream_count(&self) -> usize {
        self.slots.iter().filter(|s| s.lease.is_some()).count()
    }

    /// Whether binding `device_id` to `target` would break the reuse policy.
    pub fn conflicts(&self, device_id: &str, target: Option<SlotId>) -> bool {
        self.reuse_policy == DeviceReusePolicy::Exclusive
            && self
                .slots
                .iter()
                .any(|s| Some(s.id) != target && s.device_id() == Some(device_id))
    }

    /// Add a slot bound to `lease`. The label falls back to `Camera <id>`.
    ///
    /// On error the registry is unchanged and the lease is released.
    pub fn insert(
        &mut self,
        lease: StreamLease<H>,
        label: Option<String>,
    ) -> ClassMeetResult<SlotId> {
        if self.is_full() {
            return Err(ClassMeetError::CapacityExceeded {
                max: self.max_slots,
            });
        }
        if self.conflicts(lease.device_id(), None) {
            return Err(ClassMeetError::device_unavailable(lease.device_id()));
        }

        let id = SlotId(self.next_id);
        self.next_id += 1;
        let label = fallback_label(label, id);
        log::debug!("[SLOTS] Insert slot {} ({}) on {}", id, label, lease.device_id());

        self.slots.push(ViewSlot {
            id,
            label,
            lease: Some(lease),
            presentation: Presentation::Minimized,
        });
        Ok(id)
    }

    /// Replace the stream of slot `id`, releasing the previous one first.
    ///
    /// On error the registry is unchanged and `lease` is released.
    pub fn bind(
        &mut self,
        id: SlotId,
        lease: StreamLease<H>,
        label: Option<String>,
    ) -> ClassMeetResult<()> {
        let index = self.index_of(id).ok_or_else(|| ClassMeetError::not_found(id))?;
        if self.conflicts(lease.device_id(), Some(id)) {
            return Err(ClassMeetError::device_unavailable(lease.device_id()));
        }

        let slot = &mut self.slots[index];
        if let Some(old) = slot.lease.take() {
            log::debug!("[SLOTS] Slot {} releasing {}", id, old.device_id());
            old.release();
        }
        log::debug!("[SLOTS] Slot {} bound to {}", id, lease.device_id());
        slot.label = fallback_label(label, id);
        slot.lease = Some(lease);
        Ok(())
    }

    /// Release the stream of slot `id` and remove the slot.
    pub fn unbind(&mut self, id: SlotId) -> ClassMeetResult<()> {
        let index = self.index_of(id).ok_or_else(|| ClassMeetError::not_found(id))?;
        let mut slot = self.slots.remove(index);
        if let Some(lease) = slot.lease.take() {
            lease.release();
        }
        log::debug!("[SLOTS] Slot {} removed, {} remaining", id, self.slots.len());
        Ok(())
    }

    /// Set the presentation of one slot. Under `SingleMaximize`, maximizing
    /// a slot minimizes the rest.
    pub fn set_presentation(
        &mut self,
        id: SlotId,
        presentation: Presentation,
    ) -> ClassMeetResult<()> {
        let index = self.index_of(id).ok_or_else(|| ClassMeetError::not_found(id))?;

        if presentation == Presentation::Maximized
            && self.focus_policy == FocusPolicy::SingleMaximize
        {
            for slot in &mut self.slots {
                slot.presentation = Presentation::Minimized;
            }
        }
        self.slots[index].presentation = presentation;
        Ok(())
    }

    /// Flip one slot between maximized and minimized.
    pub fn toggle_maximize(&mut self, id: SlotId) -> ClassMeetResult<Presentation> {
        let current = self
            .view(id)
            .ok_or_else(|| ClassMeetError::not_found(id))?
            .presentation;
        let next = match current {
            Presentation::Maximized => Presentation::Minimized,
            Presentation::Minimized => Presentation::Maximized,
        };
        self.set_presentation(id, next)?;
        Ok(next)
    }

    /// Exchange stream, device and label between two slots. Ids and
    /// presentation stay where they are. Touches no hardware.
    pub fn swap(&mut self, a: SlotId, b: SlotId) -> ClassMeetResult<()> {
        let ia = self.index_of(a).ok_or_else(|| ClassMeetError::not_found(a))?;
        let ib = self.index_of(b).ok_or_else(|| ClassMeetError::not_found(b))?;
        if ia == ib {
            return Ok(());
        }

        let (lo, hi) = (ia.min(ib), ia.max(ib));
        let (left, right) = self.slots.split_at_mut(hi);
        let (first, second) = (&mut left[lo], &mut right[0]);
        std::mem::swap(&mut first.lease, &mut second.lease);
        std::mem::swap(&mut first.label, &mut second.label);
        log::debug!("[SLOTS] Swapped slots {} and {}", a, b);
        Ok(())
    }

    /// Release every stream and drop every slot. Returns the number of
    /// streams released.
    pub fn clear(&mut self) -> usize {
        let mut released = 0;
        for mut slot in self.slots.drain(..) {
            if let Some(lease) = slot.lease.take() {
                lease.release();
                released += 1;
            }
        }
        released
    }

    fn index_of(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }
}

fn fallback_label(label: Option<String>, id: SlotId) -> String {
    label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| format!("Camera {}", id))
}
