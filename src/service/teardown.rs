//! Cart teardown: removes a cart line with its participants and their options.

use crate::error::{AppError, StageExt};
use sqlx::{PgConnection, PgPool};

/// Rows removed for one cart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReceipt {
    pub shopping_cart_id: i32,
    pub options: u64,
    pub participants: u64,
    pub carts: u64,
}

pub struct CartTeardown;

impl CartTeardown {
    /// Delete one cart's options, participants and the cart itself in a single
    /// transaction. A cart that does not exist deletes nothing and succeeds.
    pub async fn teardown(pool: &PgPool, shopping_cart_id: i32) -> Result<TeardownReceipt, AppError> {
        let mut tx = pool.begin().await?;
        let receipt = delete_cart_rows(&mut *tx, shopping_cart_id).await?;
        tx.commit().await?;
        tracing::info!(
            shopping_cart_id,
            options = receipt.options,
            participants = receipt.participants,
            carts = receipt.carts,
            "cart torn down"
        );
        Ok(receipt)
    }

    /// Tear down each cart in order, one transaction per cart. Stops at the
    /// first failure; carts before it stay deleted.
    pub async fn teardown_many(
        pool: &PgPool,
        shopping_cart_ids: &[i32],
    ) -> Result<Vec<TeardownReceipt>, AppError> {
        let mut receipts = Vec::with_capacity(shopping_cart_ids.len());
        for &id in shopping_cart_ids {
            receipts.push(Self::teardown(pool, id).await?);
        }
        Ok(receipts)
    }
}

/// Options first, then participants, then the cart.
async fn delete_cart_rows(
    conn: &mut PgConnection,
    shopping_cart_id: i32,
) -> Result<TeardownReceipt, AppError> {
    tracing::debug!(shopping_cart_id, "delete cart_participant_option");
    let options = sqlx::query(
        "DELETE FROM cart_participant_option WHERE cartparticipantid IN \
         (SELECT cartparticipantid FROM cart_participant WHERE shoppingcartid = $1)",
    )
    .bind(shopping_cart_id)
    .execute(&mut *conn)
    .await
    .stage("cart_participant_option")?
    .rows_affected();

    tracing::debug!(shopping_cart_id, "delete cart_participant");
    let participants = sqlx::query("DELETE FROM cart_participant WHERE shoppingcartid = $1")
        .bind(shopping_cart_id)
        .execute(&mut *conn)
        .await
        .stage("cart_participant")?
        .rows_affected();

    tracing::debug!(shopping_cart_id, "delete shopping_cart");
    let carts = sqlx::query("DELETE FROM shopping_cart WHERE shoppingcartid = $1")
        .bind(shopping_cart_id)
        .execute(&mut *conn)
        .await
        .stage("shopping_cart")?
        .rows_affected();

    Ok(TeardownReceipt {
        shopping_cart_id,
        options,
        participants,
        carts,
    })
}
