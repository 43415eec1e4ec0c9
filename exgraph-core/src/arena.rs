//! Arena of nodes using unsigned integer indices to index
//! into vector of slots. Pushing new values returns their
//! handle. Removing elements is O(1), does not reallocate
//! and it does not change existing handles. Freed slots are
//! reused, each reuse bumps the slot's generation so stale
//! handles are detected.

use std::collections::BTreeSet;

/// Handle of a node in a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Expr {
    index: u32,
    generation: u32,
}

impl Expr {
    /// Slot index of this node
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl core::fmt::Display for Expr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}v{}", self.index, self.generation))
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Owning storage of values addressed by [`Expr`]
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    empty: BTreeSet<u32>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// New empty arena
    #[must_use]
    pub const fn new() -> Arena<T> {
        Arena {
            slots: Vec::new(),
            empty: BTreeSet::new(),
        }
    }

    /// Number of live values
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.empty.len()
    }

    /// Is arena empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store value, reusing a freed slot if there is one
    pub fn push(&mut self, value: T) -> Expr {
        if let Some(index) = self.empty.pop_first() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            Expr {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            Expr {
                index,
                generation: 0,
            }
        }
    }

    /// Value behind handle, `None` for stale handles
    #[must_use]
    pub fn get(&self, expr: Expr) -> Option<&T> {
        self.slots
            .get(expr.index as usize)
            .filter(|slot| slot.generation == expr.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Mutable value behind handle, `None` for stale handles
    #[must_use]
    pub fn get_mut(&mut self, expr: Expr) -> Option<&mut T> {
        self.slots
            .get_mut(expr.index as usize)
            .filter(|slot| slot.generation == expr.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Remove value, its slot is reused by later pushes
    pub fn remove(&mut self, expr: Expr) -> Option<T> {
        let slot = self.slots.get_mut(expr.index as usize)?;
        if slot.generation != expr.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.empty.insert(expr.index);
        Some(value)
    }

    /// Handles of all live values, in slot order
    pub fn exprs(&self) -> impl Iterator<Item = Expr> + '_ {
        self.iter().map(|(expr, _)| expr)
    }

    /// Iterate over live values with their handles
    pub fn iter(&self) -> impl Iterator<Item = (Expr, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Expr {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}
