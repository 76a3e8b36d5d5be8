use crate::errors::{Result, WorldError};
use crate::scene::component::{Component, ComponentEntry};
use crate::scene::{ComponentHandle, ObjectHandle};
use crate::world::World;

impl World {
    /// Attaches a component to `owner`. A dynamic component makes its owner
    /// (and the owner's subtree) dynamic.
    pub fn add_component<C: Component>(
        &mut self,
        owner: ObjectHandle,
        component: C,
    ) -> Result<ComponentHandle> {
        self.add_boxed_component(owner, Box::new(component))
    }

    pub fn add_boxed_component(
        &mut self,
        owner: ObjectHandle,
        component: Box<dyn Component>,
    ) -> Result<ComponentHandle> {
        if !self.objects.contains(owner) {
            return Err(WorldError::StaleObjectHandle(owner));
        }

        let is_dynamic = component.is_dynamic();
        let handle = self.components.insert(ComponentEntry { owner, component });
        if let Some(object) = self.objects.get_mut(owner) {
            object.components.push(handle);
        }

        if is_dynamic {
            self.ensure_dynamic(owner);
        }
        Ok(handle)
    }

    /// Detaches and returns a component.
    ///
    /// Removing a dynamic component lets the owner fall back to static when
    /// neither its parent, another component nor an explicit
    /// [`make_dynamic`](Self::make_dynamic) keeps it dynamic.
    pub fn remove_component(&mut self, handle: ComponentHandle) -> Result<Box<dyn Component>> {
        let entry = self
            .components
            .get(handle)
            .ok_or(WorldError::StaleComponentHandle(handle))?;
        let (owner, is_dynamic) = (entry.owner, entry.component.is_dynamic());
        if is_dynamic {
            self.conditional_make_static(owner, Some(handle));
        }

        let entry = self
            .components
            .remove(handle)
            .ok_or(WorldError::StaleComponentHandle(handle))?;
        if let Some(object) = self.objects.get_mut(owner) {
            object.components.retain(|&mut c| c != handle);
        }
        Ok(entry.component)
    }

    #[must_use]
    pub fn try_get_component<T: Component>(&self, handle: ComponentHandle) -> Option<&T> {
        self.components.get(handle)?.component.downcast_ref::<T>()
    }

    pub fn try_get_component_mut<T: Component>(&mut self, handle: ComponentHandle) -> Option<&mut T> {
        self.components.get_mut(handle)?.component.downcast_mut::<T>()
    }

    #[must_use]
    pub fn component_owner(&self, handle: ComponentHandle) -> Option<ObjectHandle> {
        self.components.get(handle).map(|entry| entry.owner)
    }

    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}
