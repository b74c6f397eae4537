//! Scheduler notifications
//!
//! Listeners are plain closures. Each list is cloned before firing so a
//! listener may register further listeners, or start and stop routines,
//! without tripping over a held borrow.

use crate::handle::RoutineHandle;
use crate::scheduler::Scheduler;
use routine_types::{Lane, RoutineFault};
use std::cell::RefCell;
use std::rc::Rc;

pub type RoutineListener = Rc<dyn Fn(&RoutineHandle)>;
pub type FaultListener = Rc<dyn Fn(&RoutineHandle, &RoutineFault)>;
pub type PassListener = Rc<dyn Fn(&Scheduler)>;

#[derive(Default)]
pub(crate) struct SchedulerEvents {
    started: RefCell<Vec<RoutineListener>>,
    stopped: RefCell<Vec<RoutineListener>>,
    exception: RefCell<Vec<FaultListener>>,
    pre_update: RefCell<Vec<PassListener>>,
    post_update: RefCell<Vec<PassListener>>,
    pre_fixed_update: RefCell<Vec<PassListener>>,
    post_fixed_update: RefCell<Vec<PassListener>>,
}

impl SchedulerEvents {
    pub(crate) fn on_started(&self, listener: RoutineListener) {
        self.started.borrow_mut().push(listener);
    }

    pub(crate) fn on_stopped(&self, listener: RoutineListener) {
        self.stopped.borrow_mut().push(listener);
    }

    pub(crate) fn on_exception(&self, listener: FaultListener) {
        self.exception.borrow_mut().push(listener);
    }

    pub(crate) fn on_pre_pass(&self, lane: Lane, listener: PassListener) {
        self.pre(lane).borrow_mut().push(listener);
    }

    pub(crate) fn on_post_pass(&self, lane: Lane, listener: PassListener) {
        self.post(lane).borrow_mut().push(listener);
    }

    pub(crate) fn fire_started(&self, handle: &RoutineHandle) {
        let listeners = self.started.borrow().clone();
        for listener in listeners {
            listener(handle);
        }
    }

    pub(crate) fn fire_stopped(&self, handle: &RoutineHandle) {
        let listeners = self.stopped.borrow().clone();
        for listener in listeners {
            listener(handle);
        }
    }

    pub(crate) fn fire_exception(&self, handle: &RoutineHandle, fault: &RoutineFault) {
        let listeners = self.exception.borrow().clone();
        for listener in listeners {
            listener(handle, fault);
        }
    }

    pub(crate) fn fire_pre_pass(&self, scheduler: &Scheduler) {
        let listeners = self.pre(scheduler.lane()).borrow().clone();
        for listener in listeners {
            listener(scheduler);
        }
    }

    pub(crate) fn fire_post_pass(&self, scheduler: &Scheduler) {
        let listeners = self.post(scheduler.lane()).borrow().clone();
        for listener in listeners {
            listener(scheduler);
        }
    }

    fn pre(&self, lane: Lane) -> &RefCell<Vec<PassListener>> {
        match lane {
            Lane::Main => &self.pre_update,
            Lane::FixedStep => &self.pre_fixed_update,
        }
    }

    fn post(&self, lane: Lane) -> &RefCell<Vec<PassListener>> {
        match lane {
            Lane::Main => &self.post_update,
            Lane::FixedStep => &self.post_fixed_update,
        }
    }
}
