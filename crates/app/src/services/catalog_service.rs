//! Catalog service: use-cases for managing actions and controllers.

use smarthome_domain::action::Action;
use smarthome_domain::controller::Controller;
use smarthome_domain::error::{NotFoundError, SmartHomeError};
use smarthome_domain::id::{ActionId, ControllerId};

use crate::ports::{ActionRepository, ControllerRepository};

/// Which actions [`CatalogService::list_actions`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionFilter {
    #[default]
    All,
    Sensors,
    Actuators,
}

impl ActionFilter {
    fn accepts(self, action: &Action) -> bool {
        match self {
            Self::All => true,
            Self::Sensors => action.is_sensor,
            Self::Actuators => !action.is_sensor,
        }
    }
}

/// Application service for the action and controller catalog.
pub struct CatalogService<AR, CR> {
    actions: AR,
    controllers: CR,
}

impl<AR, CR> CatalogService<AR, CR>
where
    AR: ActionRepository + Send + Sync,
    CR: ControllerRepository + Send + Sync,
{
    pub fn new(actions: AR, controllers: CR) -> Self {
        Self {
            actions,
            controllers,
        }
    }

    /// Create an action after validating it and its opposite.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if invariants fail,
    /// [`SmartHomeError::NotFound`] if the opposite action does not exist, or
    /// a storage error.
    #[tracing::instrument(skip(self, action), fields(action_name = %action.name))]
    pub async fn create_action(&self, action: Action) -> Result<Action, SmartHomeError> {
        action.validate()?;
        self.check_opposite(&action).await?;
        self.actions.create(action).await
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no action with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_action(&self, id: ActionId) -> Result<Action, SmartHomeError> {
        self.actions
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found("Action", id))
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_actions(&self, filter: ActionFilter) -> Result<Vec<Action>, SmartHomeError> {
        let mut actions = self.actions.get_all().await?;
        actions.retain(|action| filter.accepts(action));
        Ok(actions)
    }

    /// Replace an existing action.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::create_action`], plus
    /// [`SmartHomeError::NotFound`] if the action does not exist.
    #[tracing::instrument(skip(self, action), fields(action_id = %action.id))]
    pub async fn update_action(&self, action: Action) -> Result<Action, SmartHomeError> {
        self.get_action(action.id).await?;
        action.validate()?;
        self.check_opposite(&action).await?;
        self.actions.update(action).await
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no action with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete_action(&self, id: ActionId) -> Result<(), SmartHomeError> {
        self.actions.delete(id).await
    }

    async fn check_opposite(&self, action: &Action) -> Result<(), SmartHomeError> {
        if let Some(opposite) = action.opposite_action_id {
            self.get_action(opposite).await?;
        }
        Ok(())
    }

    /// Create a controller after checking every listed action exists.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if invariants fail,
    /// [`SmartHomeError::NotFound`] for an unknown action, or a storage error.
    #[tracing::instrument(skip(self, controller), fields(controller_name = %controller.name))]
    pub async fn create_controller(
        &self,
        controller: Controller,
    ) -> Result<Controller, SmartHomeError> {
        controller.validate()?;
        self.check_actions(&controller).await?;
        self.controllers.create(controller).await
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no controller with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_controller(&self, id: ControllerId) -> Result<Controller, SmartHomeError> {
        self.controllers
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found("Controller", id))
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_controllers(&self) -> Result<Vec<Controller>, SmartHomeError> {
        self.controllers.get_all().await
    }

    /// Replace an existing controller.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::create_controller`], plus
    /// [`SmartHomeError::NotFound`] if the controller does not exist.
    #[tracing::instrument(skip(self, controller), fields(controller_id = %controller.id))]
    pub async fn update_controller(
        &self,
        controller: Controller,
    ) -> Result<Controller, SmartHomeError> {
        self.get_controller(controller.id).await?;
        controller.validate()?;
        self.check_actions(&controller).await?;
        self.controllers.update(controller).await
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no controller with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete_controller(&self, id: ControllerId) -> Result<(), SmartHomeError> {
        self.controllers.delete(id).await
    }

    async fn check_actions(&self, controller: &Controller) -> Result<(), SmartHomeError> {
        for id in &controller.action_ids {
            self.get_action(*id).await?;
        }
        Ok(())
    }
}

fn not_found(entity: &'static str, id: impl ToString) -> SmartHomeError {
    NotFoundError {
        entity,
        id: id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemory, World};
    use smarthome_domain::error::ValidationError;
    use std::sync::Arc;

    fn catalog(
        world: &World,
    ) -> CatalogService<Arc<InMemory<Action>>, Arc<InMemory<Controller>>> {
        CatalogService::new(Arc::clone(&world.actions), Arc::clone(&world.controllers))
    }

    #[tokio::test]
    async fn should_create_action_when_valid() {
        let world = World::default();
        let action = Action::builder()
            .name("Open valve")
            .path("/valve/open")
            .build()
            .unwrap();

        let created = catalog(&world).create_action(action.clone()).await.unwrap();

        assert_eq!(created, action);
        assert_eq!(world.actions.get(action.id), Some(action));
    }

    #[tokio::test]
    async fn should_reject_action_when_opposite_is_unknown() {
        let world = World::default();
        let action = Action::builder()
            .name("Open valve")
            .path("/valve/open")
            .opposite(ActionId::new())
            .build()
            .unwrap();

        let result = catalog(&world).create_action(action).await;

        assert!(matches!(result, Err(SmartHomeError::NotFound(_))));
        assert!(world.actions.all().is_empty());
    }

    #[tokio::test]
    async fn should_filter_sensors_from_actuators() {
        let world = World::default();
        let catalog = catalog(&world);
        let sensor = Action::builder()
            .name("Temperature")
            .path("/temp")
            .sensor(true)
            .build()
            .unwrap();
        let relay = Action::builder()
            .name("Relay")
            .path("/relay")
            .build()
            .unwrap();
        catalog.create_action(sensor.clone()).await.unwrap();
        catalog.create_action(relay.clone()).await.unwrap();

        assert_eq!(
            catalog.list_actions(ActionFilter::Sensors).await.unwrap(),
            vec![sensor]
        );
        assert_eq!(
            catalog.list_actions(ActionFilter::Actuators).await.unwrap(),
            vec![relay]
        );
        assert_eq!(catalog.list_actions(ActionFilter::All).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_return_not_found_when_updating_missing_action() {
        let world = World::default();
        let action = Action::builder().name("x").path("/x").build().unwrap();

        let result = catalog(&world).update_action(action).await;

        assert!(matches!(result, Err(SmartHomeError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_reject_controller_with_unknown_action() {
        let world = World::default();
        let controller = Controller::new("Garden", "10.0.0.3", vec![ActionId::new()]).unwrap();

        let result = catalog(&world).create_controller(controller).await;

        assert!(matches!(result, Err(SmartHomeError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_reject_controller_with_empty_address() {
        let world = World::default();
        let mut controller = Controller::new("Garden", "10.0.0.3", vec![]).unwrap();
        controller.address = "  ".into();

        let result = catalog(&world).create_controller(controller).await;

        assert!(matches!(
            result,
            Err(SmartHomeError::Validation(ValidationError::EmptyAddress))
        ));
    }

    #[tokio::test]
    async fn should_update_controller_actions() {
        let world = World::default();
        let (id, _) = world.controller("10.0.0.3", &["/a"]);
        let (_, others) = world.controller("10.0.0.4", &["/b"]);
        let catalog = catalog(&world);

        let mut controller = catalog.get_controller(id).await.unwrap();
        controller.action_ids.push(others[0]);
        catalog.update_controller(controller).await.unwrap();

        assert!(world.controllers.get(id).unwrap().exposes(others[0]));
    }

    #[tokio::test]
    async fn should_delete_controller() {
        let world = World::default();
        let (id, _) = world.controller("10.0.0.3", &["/a"]);
        let catalog = catalog(&world);

        catalog.delete_controller(id).await.unwrap();

        assert!(matches!(
            catalog.get_controller(id).await,
            Err(SmartHomeError::NotFound(_))
        ));
    }
}
