use tracing::info;

use super::required;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateProductRequest, NewProduct, Page, PageRequest, Price, Product, ProductChanges,
    ProductFilter, ProductId, UpdateProductRequest,
};
use crate::store::Store;

fn not_found(id: ProductId) -> AppError {
    AppError::NotFound(format!("Product with Id {id} not found"))
}

pub async fn list(store: &dyn Store, filter: &ProductFilter, page: Option<PageRequest>) -> AppResult<Page<Product>> {
    store
        .list_products(filter, page)
        .await
        .map_err(|e| AppError::internal("Failed to retrieve products", e))
}

pub async fn get(store: &dyn Store, id: ProductId) -> AppResult<Product> {
    store
        .find_product(id)
        .await
        .map_err(|e| AppError::internal("Failed to retrieve product", e))?
        .ok_or_else(|| not_found(id))
}

pub async fn create(store: &dyn Store, req: CreateProductRequest) -> AppResult<Product> {
    let product = NewProduct {
        name: required(req.name, "name")?,
        description: required(req.description, "description")?,
        price: Price::from_decimal(required(req.price, "price")?),
        stock: required(req.stock, "stock")?,
    };
    let product = store
        .create_product(product)
        .await
        .map_err(|e| AppError::internal("Failed to create product", e))?;
    info!(product_id = %product.id, "product created");
    Ok(product)
}

pub async fn update(store: &dyn Store, id: ProductId, req: UpdateProductRequest) -> AppResult<Product> {
    store
        .update_product(id, ProductChanges::from(req))
        .await
        .map_err(|e| AppError::internal("Failed to update product", e))?
        .ok_or_else(|| not_found(id))
}

pub async fn delete(store: &dyn Store, id: ProductId) -> AppResult<()> {
    let deleted = store
        .delete_product(id)
        .await
        .map_err(|e| AppError::internal("Failed to delete product", e))?;
    if !deleted {
        return Err(not_found(id));
    }
    info!(product_id = %id, "product deleted");
    Ok(())
}
