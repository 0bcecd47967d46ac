//! Entry point bundling the session, the gateway and every service.

use std::sync::Arc;

use crate::api::{
    AdminService, AuthService, CartService, CheckoutService, OrderService, ProductService,
};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::session::{Session, SessionStore};

/// Storefront client.
///
/// This struct is cheaply cloneable via `Arc`; every clone shares one HTTP
/// connection pool and one session, so a login through any clone is seen by
/// all of them.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<StoreClientInner>,
}

struct StoreClientInner {
    config: ClientConfig,
    gateway: Gateway,
    auth: AuthService,
    products: ProductService,
    cart: CartService,
    checkout: CheckoutService,
    orders: OrderService,
    admin: AdminService,
}

impl StoreClient {
    /// Create a client whose credential lives in `store`.
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration
    /// * `store` - Where the session credential is kept
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, store: impl SessionStore) -> Result<Self, ApiError> {
        Self::with_session(config, Session::new(store))
    }

    /// Create a client acting on an existing session context.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_session(config: ClientConfig, session: Session) -> Result<Self, ApiError> {
        let gateway = Gateway::new(&config, session)?;

        Ok(Self {
            inner: Arc::new(StoreClientInner {
                auth: AuthService::new(gateway.clone(), config.login_path.clone()),
                products: ProductService::new(gateway.clone()),
                cart: CartService::new(gateway.clone()),
                checkout: CheckoutService::new(gateway.clone(), config.checkout_delay),
                orders: OrderService::new(gateway.clone()),
                admin: AdminService::new(gateway.clone()),
                gateway,
                config,
            }),
        })
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the request gateway.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    /// Get a reference to the session context.
    #[must_use]
    pub fn session(&self) -> &Session {
        self.inner.gateway.session()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn products(&self) -> &ProductService {
        &self.inner.products
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn admin(&self) -> &AdminService {
        &self.inner.admin
    }
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("api_base_url", &self.inner.config.api_base_url.as_str())
            .field("authenticated", &self.session().is_authenticated())
            .finish_non_exhaustive()
    }
}
