/// Generates the read and delete methods every entity client shares.
///
/// The client provides `owner(&id)`, the actor holding an id, and `actors()`,
/// every actor of its kind. Reads go through
/// [`retry_idempotent`](crate::retry::retry_idempotent); a delete of a missing
/// id is reported with the entity's own not-found variant.
#[macro_export]
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $id:ty, $error:ident :: $not_found:ident, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: $id) -> Result<Option<$entity>, $error> {
                    tracing::debug!("Sending request");
                    let owner = self.owner(&id);
                    $crate::retry::retry_idempotent(&self.retry, "get", || owner.get(id.clone())).await
                }

                /// Every entity across all actors, in actor order.
                #[tracing::instrument(skip(self))]
                pub async fn [<list_ $entity_name_snake s>](&self) -> Result<Vec<$entity>, $error> {
                    tracing::debug!("Sending request");
                    let mut all = Vec::new();
                    for actor in self.actors() {
                        all.extend($crate::retry::retry_idempotent(&self.retry, "list", || actor.list()).await?);
                    }
                    Ok(all)
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<delete_ $entity_name_snake>](&self, id: $id) -> Result<(), $error> {
                    tracing::debug!("Sending request");
                    match self.owner(&id).delete(id.clone()).await {
                        Err($error::Framework($crate::actor_framework::FrameworkError::NotFound(_))) => {
                            Err($error::$not_found(id))
                        }
                        result => result,
                    }
                }
            }
        }
    };
}
