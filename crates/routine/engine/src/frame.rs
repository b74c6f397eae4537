//! Resumable frames: the bodies routines are made of
//!
//! A routine is a stack of [`Resumable`] frames. The scheduler drives the
//! innermost frame one step at a time; each step either yields a
//! [`Waitable`], completes the frame (`Ok(None)`), or faults.
//!
//! Rust has no stable generators, so bodies are written as hand-rolled state
//! machines. The builders here cover the common shapes:
//!
//! - [`from_fn`] wraps an `FnMut` closure, called once per step
//! - [`from_iter`] yields every item of an iterator of waitables
//! - [`once`] runs a closure a single time and completes
//! - [`ResumableExt::named`] attaches a diagnostic name to any frame

use crate::waitable::Waitable;
use routine_types::RoutineFault;
use std::borrow::Cow;

/// Outcome of a single resume: the next waitable, completion, or a fault
pub type Step = Result<Option<Waitable>, RoutineFault>;

/// A body that can be driven externally one step at a time.
///
/// Frames may be abandoned between steps (a stopped routine is simply
/// dropped); there is no disposal callback.
pub trait Resumable {
    /// Run until the next suspension point
    fn resume(&mut self) -> Step;

    /// Name shown in diagnostics and logs
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

impl<R: Resumable + ?Sized> Resumable for Box<R> {
    fn resume(&mut self) -> Step {
        (**self).resume()
    }

    fn name(&self) -> Cow<'static, str> {
        (**self).name()
    }
}

/// Frame backed by a closure
pub struct FromFn<F> {
    f: F,
}

/// Build a frame from a closure that is called once per step
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut() -> Step,
{
    FromFn { f }
}

impl<F> Resumable for FromFn<F>
where
    F: FnMut() -> Step,
{
    fn resume(&mut self) -> Step {
        (self.f)()
    }
}

/// Frame that yields every waitable produced by an iterator
pub struct FromIter<I> {
    iter: I,
}

/// Build a frame that yields each item in turn and completes when the iterator ends
pub fn from_iter<I>(iter: I) -> FromIter<I::IntoIter>
where
    I: IntoIterator<Item = Waitable>,
{
    FromIter {
        iter: iter.into_iter(),
    }
}

impl<I> Resumable for FromIter<I>
where
    I: Iterator<Item = Waitable>,
{
    fn resume(&mut self) -> Step {
        Ok(self.iter.next())
    }
}

/// Frame that runs a closure exactly once
pub struct Once<F> {
    f: Option<F>,
}

/// Build a frame that runs `f` on its first step and then completes
pub fn once<F>(f: F) -> Once<F>
where
    F: FnOnce() -> Result<(), RoutineFault>,
{
    Once { f: Some(f) }
}

impl<F> Resumable for Once<F>
where
    F: FnOnce() -> Result<(), RoutineFault>,
{
    fn resume(&mut self) -> Step {
        if let Some(f) = self.f.take() {
            f()?;
        }
        Ok(None)
    }
}

/// A frame with an explicit diagnostic name
pub struct Named<R> {
    name: Cow<'static, str>,
    inner: R,
}

impl<R: Resumable> Resumable for Named<R> {
    fn resume(&mut self) -> Step {
        self.inner.resume()
    }

    fn name(&self) -> Cow<'static, str> {
        self.name.clone()
    }
}

pub trait ResumableExt: Resumable + Sized {
    fn named(self, name: impl Into<Cow<'static, str>>) -> Named<Self> {
        Named {
            name: name.into(),
            inner: self,
        }
    }

    fn boxed(self) -> Box<dyn Resumable>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<R: Resumable> ResumableExt for R {}
