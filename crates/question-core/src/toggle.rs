//! Coalesced show/hide scheduling for buttons.
//!
//! Requests issued during one turn are collected in [`ToggleQueue`] and
//! applied together on the next turn, so a button shown and hidden within
//! the same turn never flickers.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::button::ButtonState;
use crate::height::{collapse, set_element_height};
use crate::insert::insert;
use crate::question::{Shared, State};
use crate::section::SectionName;
use crate::toolkit::{NodeId, TaskHandle, Toolkit};

/// Pending button transitions of one question.
#[derive(Debug, Default)]
pub struct ToggleQueue {
    show: Vec<String>,
    hide: Vec<String>,
    timer: Option<TaskHandle>,
    /// Buttons waiting for their collapsing group, keyed by the settle cycle
    /// that scheduled their detach.
    hiding: HashMap<String, u64>,
    /// Collapsing buttons pulled back by a pending show, with the cycle they
    /// return to if that show is cancelled again.
    reopened: HashMap<String, u64>,
    cycle: u64,
}

impl ToggleQueue {
    pub fn is_pending_show(&self, id: &str) -> bool {
        self.show.iter().any(|pending| pending == id)
    }

    /// Scheduled for hiding, either on the next settle or after the group
    /// transition.
    pub fn is_pending_hide(&self, id: &str) -> bool {
        self.hide.iter().any(|pending| pending == id) || self.hiding.contains_key(id)
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    fn cancel(list: &mut Vec<String>, id: &str) -> bool {
        match list.iter().position(|pending| pending == id) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }
}

pub(crate) fn show_button(shared: &Rc<Shared>, state: &mut State, id: &str) {
    let Some(node) = state.buttons.node(id) else {
        trace!(id, "show ignored: unknown button");
        return;
    };
    let toggles = &mut state.toggles;

    if toggles.is_pending_show(id) {
        return;
    }
    if ToggleQueue::cancel(&mut toggles.hide, id) {
        debug!(id, "show cancelled pending hide");
        return;
    }
    if let Some(cycle) = toggles.hiding.remove(id) {
        // Still attached; the group has to open again.
        debug!(id, "show interrupted group collapse");
        toggles.reopened.insert(id.to_string(), cycle);
        toggles.show.push(id.to_string());
        schedule(shared, state);
        return;
    }
    if shared.toolkit.is_visible(node) {
        return;
    }

    trace!(id, "show queued");
    toggles.show.push(id.to_string());
    schedule(shared, state);
}

pub(crate) fn hide_button(shared: &Rc<Shared>, state: &mut State, id: &str) {
    let Some(node) = state.buttons.node(id) else {
        trace!(id, "hide ignored: unknown button");
        return;
    };
    let toggles = &mut state.toggles;

    if toggles.is_pending_hide(id) {
        return;
    }
    if ToggleQueue::cancel(&mut toggles.show, id) {
        if let Some(cycle) = toggles.reopened.remove(id) {
            // Back into the collapse it was pulled out of.
            toggles.hiding.insert(id.to_string(), cycle);
        }
        debug!(id, "hide cancelled pending show");
        return;
    }
    if !shared.toolkit.is_visible(node) {
        // Keeps the group empty for later visibility checks.
        shared.toolkit.detach(node);
        return;
    }

    trace!(id, "hide queued");
    toggles.hide.push(id.to_string());
    schedule(shared, state);
}

/// Moves focus to `id`, or to the first button not about to be hidden.
pub(crate) fn focus_button(toolkit: &dyn Toolkit, state: &State, id: Option<&str>) {
    match id {
        Some(id) => {
            if let Some(node) = state.buttons.node(id)
                && toolkit.is_visible(node)
            {
                toolkit.focus(node);
            }
        }
        None => {
            let target = state
                .buttons
                .order()
                .iter()
                .filter(|candidate| !state.toggles.is_pending_hide(candidate))
                .filter_map(|candidate| state.buttons.node(candidate))
                .find(|node| toolkit.is_visible(*node));
            if let Some(node) = target {
                toolkit.focus(node);
            }
        }
    }
}

pub(crate) fn button_state(toolkit: &dyn Toolkit, state: &State, id: &str) -> Option<ButtonState> {
    let node = state.buttons.node(id)?;
    let placed = state
        .sections
        .node(&SectionName::Buttons)
        .is_some_and(|group| toolkit.parent(node) == Some(group));

    Some(if state.toggles.is_pending_show(id) {
        ButtonState::PendingShow
    } else if state.toggles.is_pending_hide(id) {
        ButtonState::PendingHide
    } else if placed {
        ButtonState::Visible
    } else {
        ButtonState::Detached
    })
}

fn schedule(shared: &Rc<Shared>, state: &mut State) {
    if state.toggles.timer.is_some() {
        return;
    }
    let weak = Rc::downgrade(shared);
    let handle = shared.tasks.defer(
        Duration::ZERO,
        Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                let mut state = shared.state.borrow_mut();
                settle(&shared, &mut state);
            }
        }),
    );
    state.toggles.timer = Some(handle);
}

/// Applies every pending request: shows first, then focus relocation, then hides.
fn settle(shared: &Rc<Shared>, state: &mut State) {
    state.toggles.timer = None;
    let toolkit = shared.toolkit.as_ref();
    if state.toggles.show.is_empty() && state.toggles.hide.is_empty() {
        trace!("nothing left to settle");
        return;
    }
    let Some(group) = state.sections.node(&SectionName::Buttons) else {
        state.toggles.show.clear();
        state.toggles.hide.clear();
        state.toggles.reopened.clear();
        return;
    };

    let show = std::mem::take(&mut state.toggles.show);
    state.toggles.reopened.clear();
    for id in &show {
        insert(
            toolkit,
            state.buttons.order(),
            id,
            |candidate| state.buttons.node(candidate),
            group,
        );
    }

    let focused = state
        .toggles
        .hide
        .iter()
        .filter_map(|id| state.buttons.node(id))
        .any(|node| toolkit.has_focus(node));
    if focused {
        focus_button(toolkit, state, None);
    }

    let hide = std::mem::take(&mut state.toggles.hide);
    let remaining = attached_buttons(toolkit, state, group);
    let visible_class = shared.config.class("visible");
    debug!(
        shown = show.len(),
        hidden = hide.len(),
        remaining,
        "settling button toggles"
    );

    if !hide.is_empty() && hide.len() == remaining {
        toolkit.remove_class(group, &visible_class);
        collapse(toolkit, group);

        state.toggles.cycle += 1;
        let cycle = state.toggles.cycle;
        for id in hide {
            state.toggles.hiding.insert(id, cycle);
        }
        schedule_group_detach(shared, cycle);
        return;
    }

    for id in &hide {
        if let Some(node) = state.buttons.node(id) {
            toolkit.detach(node);
        }
    }
    // The group stays open, so buttons of an earlier collapse go right away.
    for (id, _) in state.toggles.hiding.drain() {
        if let Some(node) = state.buttons.node(&id) {
            toolkit.detach(node);
        }
    }

    if toolkit.child_count(group) > 0 {
        toolkit.add_class(group, &visible_class);
        set_element_height(toolkit, group);
    }
}

/// Buttons in the group that are not already collapsing.
fn attached_buttons(toolkit: &dyn Toolkit, state: &State, group: NodeId) -> usize {
    state
        .buttons
        .order()
        .iter()
        .filter(|id| !state.toggles.hiding.contains_key(id.as_str()))
        .filter_map(|id| state.buttons.node(id))
        .filter(|node| toolkit.parent(*node) == Some(group))
        .count()
}

fn schedule_group_detach(shared: &Rc<Shared>, cycle: u64) {
    let weak = Rc::downgrade(shared);
    shared.tasks.defer(
        shared.config.transition(),
        Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut state = shared.state.borrow_mut();
            let expired: Vec<String> = state
                .toggles
                .hiding
                .iter()
                .filter(|(_, scheduled)| **scheduled == cycle)
                .map(|(id, _)| id.clone())
                .collect();
            for id in expired {
                state.toggles.hiding.remove(&id);
                if let Some(node) = state.buttons.node(&id) {
                    shared.toolkit.detach(node);
                }
            }
            trace!(cycle, "group collapse finished");
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_requests_cancel_instead_of_queueing() {
        let mut queue = ToggleQueue::default();
        queue.hide.push("check".into());
        assert!(ToggleQueue::cancel(&mut queue.hide, "check"));
        assert!(!ToggleQueue::cancel(&mut queue.hide, "check"));
        assert!(!queue.is_pending_hide("check"));
        assert!(!queue.is_pending_show("check"));
    }

    #[test]
    fn collapsing_buttons_count_as_pending_hide() {
        let mut queue = ToggleQueue::default();
        queue.hiding.insert("retry".into(), 1);
        assert!(queue.is_pending_hide("retry"));
        assert!(!queue.has_timer());
    }
}
