//! Which data axis plays which screen role.

use super::observers::{Observers, SubscriptionId};
use crate::error::{IauError, Result};

/// Screen role of one data axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisRole {
    /// Varies along the horizontal screen axis.
    Horizontal,
    /// Varies along the vertical screen axis.
    Vertical,
    /// Pinned at the given index.
    Fixed(usize),
}

impl AxisRole {
    /// Horizontal or vertical.
    pub fn is_free(self) -> bool {
        !matches!(self, Self::Fixed(_))
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Horizontal => "x-axis",
            Self::Vertical => "y-axis",
            Self::Fixed(_) => "fixed",
        }
    }
}

/// Change notification from an [`AxisRoleAssignment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleEvent {
    /// `axis` took `role`; `displaced` is the axis that gave it up and its new role.
    Assigned {
        axis: usize,
        role: AxisRole,
        displaced: Option<(usize, AxisRole)>,
    },
    /// A fixed axis moved to another index.
    FixedIndexChanged { axis: usize, index: usize },
    /// Roles were rebuilt for a new input shape.
    Reset,
}

/// Role of every axis of one view.
///
/// Exactly one axis is horizontal. Views of two or more dimensions have
/// exactly one vertical axis as well; all remaining axes are fixed.
#[derive(Debug)]
pub struct AxisRoleAssignment {
    roles: Vec<AxisRole>,
    extents: Vec<usize>,
    observers: Observers<RoleEvent>,
}

fn default_roles(ndim: usize) -> Vec<AxisRole> {
    (0..ndim)
        .map(|i| match i {
            0 => AxisRole::Horizontal,
            1 => AxisRole::Vertical,
            _ => AxisRole::Fixed(0),
        })
        .collect()
}

impl AxisRoleAssignment {
    /// Default assignment: axis 0 horizontal, axis 1 vertical, the rest fixed at 0.
    pub fn new(shape: &[usize]) -> Result<Self> {
        if shape.is_empty() {
            return Err(IauError::InvalidShape(
                "a view needs at least one axis".to_string(),
            ));
        }
        Ok(Self {
            roles: default_roles(shape.len()),
            extents: shape.to_vec(),
            observers: Observers::default(),
        })
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.roles.len()
    }

    /// Axis lengths the roles were validated against.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Roles in axis order.
    pub fn roles(&self) -> &[AxisRole] {
        &self.roles
    }

    /// Role of one axis.
    pub fn role(&self, axis: usize) -> Result<AxisRole> {
        self.check_axis(axis)?;
        Ok(self.roles[axis])
    }

    /// The horizontal axis.
    pub fn horizontal_axis(&self) -> usize {
        self.position(AxisRole::Horizontal).unwrap_or(0)
    }

    /// The vertical axis; `None` for one-dimensional views.
    pub fn vertical_axis(&self) -> Option<usize> {
        self.position(AxisRole::Vertical)
    }

    /// Free axes: horizontal first, then vertical if any.
    pub fn free_axes(&self) -> Vec<usize> {
        let mut free = vec![self.horizontal_axis()];
        free.extend(self.vertical_axis());
        free
    }

    /// `(axis, index)` of every fixed axis in ascending axis order.
    pub fn fixed_axes(&self) -> Vec<(usize, usize)> {
        self.roles
            .iter()
            .enumerate()
            .filter_map(|(axis, role)| match role {
                AxisRole::Fixed(index) => Some((axis, *index)),
                _ => None,
            })
            .collect()
    }

    /// Give `axis` a new role.
    ///
    /// The axis that held a free role hands it over and takes `axis`'s previous
    /// role instead; a displaced axis that becomes fixed starts at index 0.
    /// Making a free axis fixed hands its role to the lowest-index fixed axis.
    pub fn assign_role(&mut self, axis: usize, role: AxisRole) -> Result<()> {
        self.check_axis(axis)?;
        if let AxisRole::Fixed(index) = role {
            self.check_index(axis, index)?;
        }

        let current = self.roles[axis];
        let displaced = match role {
            AxisRole::Horizontal | AxisRole::Vertical if current == role => None,
            AxisRole::Horizontal | AxisRole::Vertical => {
                let holder = self.position(role).ok_or_else(|| {
                    IauError::InvalidRole(format!(
                        "{}-dimensional views have no {}",
                        self.ndim(),
                        role.name()
                    ))
                })?;
                let handed_back = match current {
                    AxisRole::Fixed(_) => AxisRole::Fixed(0),
                    free => free,
                };
                Some((holder, handed_back))
            }
            AxisRole::Fixed(_) if !current.is_free() => None,
            AxisRole::Fixed(_) => {
                let heir = self
                    .roles
                    .iter()
                    .enumerate()
                    .find(|(i, r)| *i != axis && !r.is_free())
                    .map(|(i, _)| i)
                    .ok_or_else(|| {
                        IauError::InvalidRole(format!(
                            "no fixed axis can take over the {} of axis {}",
                            current.name(),
                            axis
                        ))
                    })?;
                Some((heir, current))
            }
        };

        if let Some((other, other_role)) = displaced {
            self.roles[other] = other_role;
        }
        self.roles[axis] = role;
        debug_assert!(self.invariant_holds());

        tracing::debug!("Axis {} -> {:?} (displaced {:?})", axis, role, displaced);
        self.observers.notify(&RoleEvent::Assigned {
            axis,
            role,
            displaced,
        });
        Ok(())
    }

    /// Move a fixed axis to another index.
    pub fn set_fixed_index(&mut self, axis: usize, index: usize) -> Result<()> {
        self.check_axis(axis)?;
        if self.roles[axis].is_free() {
            return Err(IauError::InvalidRole(format!(
                "axis {} is the {}, not fixed",
                axis,
                self.roles[axis].name()
            )));
        }
        self.check_index(axis, index)?;
        self.roles[axis] = AxisRole::Fixed(index);
        self.observers
            .notify(&RoleEvent::FixedIndexChanged { axis, index });
        Ok(())
    }

    /// Adapt to a new input shape.
    ///
    /// Same dimensionality keeps the roles and clamps fixed indices into
    /// range; anything else falls back to the default assignment. Returns true
    /// if the roles were kept.
    pub fn retarget(&mut self, shape: &[usize]) -> Result<bool> {
        if shape.is_empty() {
            return Err(IauError::InvalidShape(
                "a view needs at least one axis".to_string(),
            ));
        }
        let kept = shape.len() == self.roles.len();
        if kept {
            for (role, &len) in self.roles.iter_mut().zip(shape) {
                if let AxisRole::Fixed(index) = role {
                    *index = (*index).min(len.saturating_sub(1));
                }
            }
        } else {
            self.roles = default_roles(shape.len());
        }
        self.extents = shape.to_vec();
        self.observers.notify(&RoleEvent::Reset);
        Ok(kept)
    }

    /// Register a role-change callback.
    pub fn subscribe(&mut self, callback: impl FnMut(&RoleEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    /// Remove a role-change callback.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// One horizontal axis, one vertical axis for 2+ dimensions, none otherwise.
    pub fn invariant_holds(&self) -> bool {
        let count = |wanted: AxisRole| self.roles.iter().filter(|r| **r == wanted).count();
        let expected_vertical = usize::from(self.ndim() >= 2);
        count(AxisRole::Horizontal) == 1 && count(AxisRole::Vertical) == expected_vertical
    }

    fn position(&self, role: AxisRole) -> Option<usize> {
        self.roles.iter().position(|r| *r == role)
    }

    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis >= self.roles.len() {
            return Err(IauError::InvalidAxis {
                axis,
                ndim: self.roles.len(),
            });
        }
        Ok(())
    }

    fn check_index(&self, axis: usize, index: usize) -> Result<()> {
        let len = self.extents[axis];
        if index >= len {
            return Err(IauError::InvalidIndex { axis, index, len });
        }
        Ok(())
    }
}
