//! Sesión de dashboard por identidad
//!
//! Una única tarea por identidad es dueña del conjunto de rutas, del mapa de
//! estado, de los parámetros de vista y de la cache de la vista derivada. Los
//! handlers HTTP le hablan con mensajes; los snapshots de los dos documentos
//! llegan por streams del gateway y el último recibido gana.
//!
//! Las escrituras del mapa de estado pasan por una tarea escritora propia de
//! la sesión, en orden, y cada resultado vuelve al bucle para confirmar o
//! revertir el estado optimista.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

use crate::models::route::RouteRecord;
use crate::models::status::{active_count, ActiveStatusMap};
use crate::models::view::{DerivedView, ViewParams, ViewUpdate};
use crate::repositories::document_store::DocumentSnapshot;
use crate::repositories::gateway::{decode_routes, decode_status, DocumentStream, PersistenceGateway};
use crate::services::status_toggle::StatusSync;
use crate::services::view_engine::ViewCache;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::metrics::AppMetrics;

const COMMAND_BUFFER: usize = 64;

/// Lo que un cliente ve de su sesión
#[derive(Debug, Clone)]
pub struct SessionView {
    /// `true` hasta recibir el primer snapshot de ambos documentos
    pub loading: bool,
    pub params: ViewParams,
    pub view: DerivedView,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub route_id: String,
    pub in_use: bool,
    pub active_count: usize,
}

pub enum SessionCommand {
    View {
        reply: oneshot::Sender<SessionView>,
    },
    UpdateView {
        update: ViewUpdate,
        reply: oneshot::Sender<SessionView>,
    },
    Toggle {
        route_id: String,
        reply: oneshot::Sender<AppResult<ToggleOutcome>>,
    },
    /// Conjunto de rutas ya persistido por una subida
    ApplyRoutes {
        routes: Vec<RouteRecord>,
        reply: oneshot::Sender<()>,
    },
    /// Borrar ambos documentos, después de las escrituras pendientes
    Clear {
        reply: oneshot::Sender<AppResult<()>>,
    },
    Stop,
}

/// Trabajo para la tarea escritora
enum WriteJob {
    SaveStatus(ActiveStatusMap),
    ClearAll(oneshot::Sender<AppResult<()>>),
}

/// Resultado de un trabajo de escritura, de vuelta al bucle
enum WriteAck {
    Status {
        written: ActiveStatusMap,
        result: AppResult<()>,
    },
    Cleared {
        result: AppResult<()>,
        reply: oneshot::Sender<AppResult<()>>,
    },
}

/// Manejador clonable de una sesión en marcha
#[derive(Clone)]
pub struct SessionHandle {
    uid: String,
    tx: mpsc::Sender<SessionCommand>,
    last_access: Arc<Mutex<Instant>>,
}

impl SessionHandle {
    fn touch(&self) {
        *self.last_access.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    /// Tiempo desde el último comando enviado a la sesión
    pub fn idle_for(&self) -> Duration {
        self.last_access
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> AppResult<T> {
        self.touch();
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| session_stopped(&self.uid))?;
        response.await.map_err(|_| session_stopped(&self.uid))
    }

    pub async fn view(&self) -> AppResult<SessionView> {
        self.request(|reply| SessionCommand::View { reply }).await
    }

    pub async fn update_view(&self, update: ViewUpdate) -> AppResult<SessionView> {
        self.request(|reply| SessionCommand::UpdateView { update, reply }).await
    }

    pub async fn toggle(&self, route_id: &str) -> AppResult<ToggleOutcome> {
        let route_id = route_id.to_string();
        self.request(|reply| SessionCommand::Toggle { route_id, reply }).await?
    }

    pub async fn apply_routes(&self, routes: Vec<RouteRecord>) -> AppResult<()> {
        self.request(|reply| SessionCommand::ApplyRoutes { routes, reply }).await
    }

    pub async fn clear(&self) -> AppResult<()> {
        self.request(|reply| SessionCommand::Clear { reply }).await?
    }

    pub async fn stop(&self) {
        // si el bucle ya terminó no hay nada que parar
        let _ = self.tx.send(SessionCommand::Stop).await;
    }
}

fn session_stopped(uid: &str) -> AppError {
    AppError::ServiceUnavailable(format!("La sesión {} no está activa", uid))
}

/// Estado propiedad del bucle de la sesión
struct DashboardSession {
    uid: String,
    metrics: AppMetrics,
    routes: Vec<RouteRecord>,
    routes_revision: u64,
    routes_loaded: bool,
    status: StatusSync,
    status_loaded: bool,
    params: ViewParams,
    cache: ViewCache,
    writes: mpsc::UnboundedSender<WriteJob>,
    /// Borrados enviados al escritor y aún sin confirmar
    clears_pending: usize,
}

impl DashboardSession {
    fn snapshot(&mut self) -> SessionView {
        let view = self
            .cache
            .get_or_compute(
                self.routes_revision,
                self.status.revision(),
                &self.routes,
                self.status.visible(),
                &self.params,
            )
            .clone();

        SessionView {
            loading: !(self.routes_loaded && self.status_loaded),
            params: self.params.clone(),
            view,
        }
    }

    fn replace_routes(&mut self, routes: Vec<RouteRecord>) {
        self.routes = routes;
        self.routes_revision += 1;
        self.routes_loaded = true;
    }

    fn on_routes_snapshot(&mut self, snapshot: AppResult<DocumentSnapshot>) {
        match snapshot.and_then(|snapshot| decode_routes(&snapshot)) {
            Ok(routes) => {
                debug!("📥 [{}] Snapshot de rutas: {} rutas", self.uid, routes.len());
                self.replace_routes(routes);
            }
            Err(e) => warn!("⚠️ [{}] Snapshot de rutas descartado: {}", self.uid, e),
        }
    }

    fn on_status_snapshot(&mut self, snapshot: AppResult<DocumentSnapshot>) {
        match snapshot.and_then(|snapshot| decode_status(&snapshot)) {
            Ok(active) => {
                debug!("📥 [{}] Snapshot de estado: {} entradas", self.uid, active.len());
                self.status.on_snapshot(active);
                self.status_loaded = true;
            }
            Err(e) => warn!("⚠️ [{}] Snapshot de estado descartado: {}", self.uid, e),
        }
    }

    fn toggle(&mut self, route_id: &str) -> AppResult<ToggleOutcome> {
        // el mapa visible todavía es el anterior al borrado
        if self.clears_pending > 0 {
            return Err(AppError::ServiceUnavailable(
                "Borrado de datos en curso, intente de nuevo".to_string(),
            ));
        }
        if !self.routes.iter().any(|route| route.id == route_id) {
            return Err(not_found_error("Ruta", route_id));
        }

        let (in_use, to_write) = self.status.toggle(route_id);
        if self.writes.send(WriteJob::SaveStatus(to_write)).is_err() {
            error!("❌ [{}] Escritor de estado detenido", self.uid);
            self.status.on_write_failed();
            return Err(session_stopped(&self.uid));
        }
        self.metrics.toggles.inc();

        Ok(ToggleOutcome {
            route_id: route_id.to_string(),
            in_use,
            active_count: active_count(self.status.visible()),
        })
    }

    fn on_write_ack(&mut self, ack: WriteAck) {
        match ack {
            WriteAck::Status { written, result: Ok(()) } => self.status.on_write_ok(written),
            WriteAck::Status { result: Err(e), .. } => {
                error!("❌ [{}] Error guardando el estado de uso: {}", self.uid, e);
                self.metrics.record_failure("save_status");
                if self.status.on_write_failed() {
                    warn!("↩️ [{}] Estado de uso revertido al último confirmado", self.uid);
                }
            }
            WriteAck::Cleared { result, reply } => {
                self.clears_pending = self.clears_pending.saturating_sub(1);
                match &result {
                    Ok(()) => {
                        info!("🗑️ [{}] Datos de la sesión borrados", self.uid);
                        self.replace_routes(Vec::new());
                        self.status.clear();
                        self.params.page = 1;
                    }
                    Err(e) => {
                        error!("❌ [{}] Error borrando los datos: {}", self.uid, e);
                        self.metrics.record_failure("clear");
                    }
                }
                let _ = reply.send(result);
            }
        }
    }

    fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::View { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::UpdateView { update, reply } => {
                if self.params.apply(update) {
                    debug!("🔎 [{}] Parámetros de vista: {:?}", self.uid, self.params);
                }
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::Toggle { route_id, reply } => {
                let _ = reply.send(self.toggle(&route_id));
            }
            SessionCommand::ApplyRoutes { routes, reply } => {
                info!("📦 [{}] {} rutas aplicadas", self.uid, routes.len());
                self.replace_routes(routes);
                self.params.page = 1;
                let _ = reply.send(());
            }
            SessionCommand::Clear { reply } => match self.writes.send(WriteJob::ClearAll(reply)) {
                Ok(()) => self.clears_pending += 1,
                Err(mpsc::error::SendError(WriteJob::ClearAll(reply))) => {
                    let _ = reply.send(Err(session_stopped(&self.uid)));
                }
                Err(_) => {}
            },
            SessionCommand::Stop => return false,
        }
        true
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut acks: mpsc::UnboundedReceiver<WriteAck>,
        mut routes_stream: DocumentStream,
        mut status_stream: DocumentStream,
    ) {
        info!("▶️ Sesión iniciada para {}", self.uid);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle(command) {
                            break;
                        }
                    }
                    None => break,
                },
                Some(snapshot) = routes_stream.next() => self.on_routes_snapshot(snapshot),
                Some(snapshot) = status_stream.next() => self.on_status_snapshot(snapshot),
                Some(ack) = acks.recv() => self.on_write_ack(ack),
            }
        }

        info!("⏹️ Sesión detenida para {}", self.uid);
    }
}

/// Tarea escritora: ejecuta los trabajos en orden y devuelve cada resultado
async fn run_writer(
    uid: String,
    gateway: PersistenceGateway,
    mut jobs: mpsc::UnboundedReceiver<WriteJob>,
    acks: mpsc::UnboundedSender<WriteAck>,
) {
    while let Some(job) = jobs.recv().await {
        let ack = match job {
            WriteJob::SaveStatus(written) => {
                let result = gateway.save_status(&uid, &written).await;
                WriteAck::Status { written, result }
            }
            WriteJob::ClearAll(reply) => {
                let result = gateway.clear_user(&uid).await;
                WriteAck::Cleared { result, reply }
            }
        };
        // la sesión pudo terminar; los trabajos en cola se escriben igual
        let _ = acks.send(ack);
    }
}

/// Arrancar la sesión de una identidad
pub fn start_session(uid: &str, gateway: PersistenceGateway, metrics: AppMetrics) -> SessionHandle {
    let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
    let (writes_tx, writes_rx) = mpsc::unbounded_channel();
    let (acks_tx, acks_rx) = mpsc::unbounded_channel();

    let routes_stream = gateway.subscribe(&gateway.routes_key(uid));
    let status_stream = gateway.subscribe(&gateway.status_key(uid));

    tokio::spawn(run_writer(uid.to_string(), gateway, writes_rx, acks_tx));

    let session = DashboardSession {
        uid: uid.to_string(),
        metrics: metrics.clone(),
        routes: Vec::new(),
        routes_revision: 0,
        routes_loaded: false,
        status: StatusSync::default(),
        status_loaded: false,
        params: ViewParams::default(),
        cache: ViewCache::default(),
        writes: writes_tx,
        clears_pending: 0,
    };

    metrics.active_sessions.inc();
    tokio::spawn(async move {
        session.run(commands, acks_rx, routes_stream, status_stream).await;
        metrics.active_sessions.dec();
    });

    SessionHandle {
        uid: uid.to_string(),
        tx,
        last_access: Arc::new(Mutex::new(Instant::now())),
    }
}

/// Registro de sesiones activas por uid
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    gateway: PersistenceGateway,
    metrics: AppMetrics,
}

impl SessionRegistry {
    pub fn new(gateway: PersistenceGateway, metrics: AppMetrics) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            gateway,
            metrics,
        }
    }

    /// Sesión de `uid`, arrancándola si no existe o si su bucle terminó
    pub async fn get_or_start(&self, uid: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(uid) {
            if handle.is_running() {
                return handle.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(uid) {
            if handle.is_running() {
                return handle.clone();
            }
        }

        let handle = start_session(uid, self.gateway.clone(), self.metrics.clone());
        sessions.insert(uid.to_string(), handle.clone());
        handle
    }

    pub async fn stop(&self, uid: &str) -> bool {
        let removed = self.sessions.write().await.remove(uid);
        match removed {
            Some(handle) => {
                handle.stop().await;
                true
            }
            None => false,
        }
    }

    pub async fn stop_all(&self) {
        let handles: Vec<SessionHandle> = self.sessions.write().await.drain().map(|(_, h)| h).collect();
        info!("🛑 Deteniendo {} sesiones", handles.len());
        for handle in handles {
            handle.stop().await;
        }
    }

    /// Detener las sesiones sin comandos durante `max_idle` o cuyo bucle terminó
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted: Vec<SessionHandle> = {
            let mut sessions = self.sessions.write().await;
            let idle: Vec<String> = sessions
                .iter()
                .filter(|(_, handle)| !handle.is_running() || handle.idle_for() >= max_idle)
                .map(|(uid, _)| uid.clone())
                .collect();
            idle.iter().filter_map(|uid| sessions.remove(uid)).collect()
        };

        for handle in &evicted {
            handle.stop().await;
        }
        if !evicted.is_empty() {
            info!("🧹 {} sesiones inactivas detenidas", evicted.len());
        }
        evicted.len()
    }

    /// Barrido periódico de sesiones inactivas
    pub fn spawn_idle_sweeper(&self, max_idle: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let period = (max_idle / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                registry.evict_idle(max_idle).await;
            }
        })
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }
}
