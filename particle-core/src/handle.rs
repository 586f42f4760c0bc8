//! Owned-or-shared references between simulation objects.
//!
//! A [`Group`](crate::group::Group) owns its emitters and modifiers, an
//! emitter owns its zone, and so on. When the same object has to be used
//! by several owners (a zone shared by an emitter and a modifier, an
//! emitter used both by a group and for manual spawning) it is wrapped in
//! a shared handle instead. Whether to share or to copy is decided when the
//! graph is composed: cloning an owned handle deep-copies the object,
//! cloning a shared handle shares it.

use std::cell::{Ref, RefCell, RefMut};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

#[derive(Debug)]
pub enum Handle<T: ?Sized> {
    Owned(Box<T>),
    Shared(Rc<RefCell<T>>),
}

/// Immutable access to the object behind a [`Handle`].
pub enum HandleRef<'a, T: ?Sized> {
    Owned(&'a T),
    Shared(Ref<'a, T>),
}

/// Mutable access to the object behind a [`Handle`].
pub enum HandleMut<'a, T: ?Sized> {
    Owned(&'a mut T),
    Shared(RefMut<'a, T>),
}

impl<T> Handle<T> {
    pub fn owned(value: T) -> Self {
        Handle::Owned(Box::new(value))
    }

    pub fn shared(value: T) -> Self {
        Handle::Shared(Rc::new(RefCell::new(value)))
    }
}

impl<T: ?Sized> Handle<T> {
    /// Borrows the object.
    ///
    /// ### Panics
    /// Panics if a shared object is currently mutably borrowed.
    pub fn borrow(&self) -> HandleRef<'_, T> {
        match self {
            Handle::Owned(b) => HandleRef::Owned(b),
            Handle::Shared(rc) => HandleRef::Shared(rc.borrow()),
        }
    }

    /// Mutably borrows the object.
    ///
    /// ### Panics
    /// Panics if a shared object is currently borrowed elsewhere.
    pub fn borrow_mut(&mut self) -> HandleMut<'_, T> {
        match self {
            Handle::Owned(b) => HandleMut::Owned(b),
            Handle::Shared(rc) => HandleMut::Shared(rc.borrow_mut()),
        }
    }

    /// Borrows the object, or returns `None` if a shared object is
    /// currently mutably borrowed.
    pub fn try_borrow(&self) -> Option<HandleRef<'_, T>> {
        match self {
            Handle::Owned(b) => Some(HandleRef::Owned(b)),
            Handle::Shared(rc) => rc.try_borrow().ok().map(HandleRef::Shared),
        }
    }

    /// Mutably borrows the object, or returns `None` if a shared object is
    /// currently borrowed elsewhere.
    pub fn try_borrow_mut(&mut self) -> Option<HandleMut<'_, T>> {
        match self {
            Handle::Owned(b) => Some(HandleMut::Owned(b)),
            Handle::Shared(rc) => rc.try_borrow_mut().ok().map(HandleMut::Shared),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Handle::Shared(_))
    }

    /// Returns another handle on the same object, if it is shared.
    pub fn share(&self) -> Option<Self> {
        match self {
            Handle::Owned(_) => None,
            Handle::Shared(rc) => Some(Handle::Shared(Rc::clone(rc))),
        }
    }

    /// Returns `true` if both handles designate the same shared object.
    ///
    /// Owned handles are unique by construction and never compare equal.
    pub fn same_object(&self, other: &Self) -> bool {
        match (self, other) {
            (Handle::Shared(a), Handle::Shared(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: Clone> Clone for Handle<T> {
    fn clone(&self) -> Self {
        match self {
            Handle::Owned(b) => Handle::Owned(b.clone()),
            Handle::Shared(rc) => Handle::Shared(Rc::clone(rc)),
        }
    }
}

impl<T> From<T> for Handle<T> {
    fn from(value: T) -> Self {
        Handle::owned(value)
    }
}

impl<T: ?Sized> Deref for HandleRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            HandleRef::Owned(r) => r,
            HandleRef::Shared(r) => r,
        }
    }
}

impl<T: ?Sized> Deref for HandleMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            HandleMut::Owned(r) => r,
            HandleMut::Shared(r) => r,
        }
    }
}

impl<T: ?Sized> DerefMut for HandleMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            HandleMut::Owned(r) => r,
            HandleMut::Shared(r) => r,
        }
    }
}
