use crate::config::Config;

/// How a route serializes its query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// Full ordered result set as a JSON array of row objects.
    RowList,
    /// First row only, as a bare JSON object. Used by scalar aggregates.
    SingleRow,
}

/// One immutable query template bound to a route path.
#[derive(Debug, Clone)]
pub struct QueryRoute {
    pub path: &'static str,
    pub sql: String,
    pub shape: ResultShape,
    // Short static message returned to the client on any query failure.
    // Full detail stays in the server log.
    pub error_msg: &'static str,
}

// Unique users with one representative value per non-key column. The
// ARRAY_AGG(... LIMIT 1)[OFFSET(0)] picks the first observed value instead of
// erroring on columns not functionally dependent on the group key.
const SQL_USUARIOS: &str = "\
SELECT
  usuario,
  ARRAY_AGG(tipo_usuario LIMIT 1)[OFFSET(0)] AS tipo_usuario,
  ARRAY_AGG(perfil LIMIT 1)[OFFSET(0)] AS perfil,
  ARRAY_AGG(objeto_autorizacion LIMIT 1)[OFFSET(0)] AS objeto_autorizacion,
  ARRAY_AGG(ambito_autorizacion LIMIT 1)[OFFSET(0)] AS ambito_autorizacion,
  ARRAY_AGG(valor_autorizacion1 LIMIT 1)[OFFSET(0)] AS valor_autorizacion1,
  ARRAY_AGG(rol LIMIT 1)[OFFSET(0)] AS rol
FROM `{fact}`
GROUP BY usuario
ORDER BY usuario ASC";

const SQL_NIVELES_RIESGO: &str = "\
SELECT
  nivel_de_riesgo,
  COUNT(*) AS total
FROM `{fact}`
GROUP BY nivel_de_riesgo
ORDER BY nivel_de_riesgo ASC";

const SQL_DESC_PROC_EMP: &str = "\
SELECT
  desc_proc_emp,
  COUNT(*) AS total
FROM `{fact}`
GROUP BY desc_proc_emp
ORDER BY total DESC";

const SQL_USUARIOS_FRECUENCIA: &str = "\
SELECT
  usuario,
  COUNT(*) AS total
FROM `{fact}`
GROUP BY usuario
ORDER BY total DESC";

const SQL_USUARIOS_POR_PROCESO: &str = "\
SELECT
  desc_proc_emp,
  nivel_de_riesgo,
  descripcion_riesgo,
  COUNT(DISTINCT usuario) AS total_usuarios
FROM `{fact}`
GROUP BY desc_proc_emp, nivel_de_riesgo, descripcion_riesgo
ORDER BY total_usuarios DESC";

// Risk counts deduplicate on (usuario, riesgo, tipo_riesgo) before counting,
// so a user appearing in many source rows for the same risk counts once.
const SQL_CONTEO_SOD: &str = "\
SELECT COUNT(*) AS TOTAL_SOD
FROM (
  SELECT DISTINCT usuario, riesgo, tipo_riesgo
  FROM `{fact}`
  WHERE tipo_riesgo = 'SOD'
) AS subquery";

// The TOTAL_SOD alias is kept for the AC count as well: the dashboard reads
// that key from both endpoints.
const SQL_CONTEO_AC: &str = "\
SELECT COUNT(*) AS TOTAL_SOD
FROM (
  SELECT DISTINCT usuario, riesgo, tipo_riesgo
  FROM `{fact}`
  WHERE tipo_riesgo = 'AC'
) AS subquery";

const SQL_TOTAL_USERS: &str = "\
SELECT COUNT(*) AS TOTAL_USER
FROM (
  SELECT DISTINCT usuario FROM `{fact}`
) AS subquery";

// Raw row count over (user, risk, process) tuples, deliberately without
// deduplication.
const SQL_USUARIOS_RIESGOS: &str = "\
SELECT COUNT(*) AS USUARIOS_RIESGOS
FROM (
  SELECT usuario, riesgo, desc_proc_emp
  FROM `{fact}`
) AS subquery";

// License rows are ranked per user by a fixed tier priority (three named
// tiers, then a catch-all lowest tier) and only the top-ranked row per user
// survives. This is a deterministic tie-break, not a sample.
const SQL_USUARIOS_LICENCIAS: &str = "\
WITH LicenciasOrdenadas AS (
  SELECT
    usuario,
    Licencia,
    ROW_NUMBER() OVER(
      PARTITION BY usuario
      ORDER BY
        CASE
          WHEN Licencia = 'GB Advanced Use' THEN 1
          WHEN Licencia = 'GC Core Use' THEN 2
          WHEN Licencia = 'GD Self-Service Use' THEN 3
          ELSE 4
        END
    ) AS rn
  FROM `{lic}`
)
SELECT
  Licencia,
  COUNT(*) AS total_usuarios
FROM LicenciasOrdenadas
WHERE rn = 1
GROUP BY Licencia
ORDER BY total_usuarios DESC";

// Same per-user ranking, then a fixed page of 5 rows ordered by tier rank and
// user id. The page size is not configurable.
const SQL_USUARIOS_LICENCIA_DETALLE: &str = "\
WITH LicenciasOrdenadas AS (
  SELECT
    usuario,
    Licencia,
    ROW_NUMBER() OVER(
      PARTITION BY usuario
      ORDER BY
        CASE
          WHEN Licencia = 'GB Advanced Use' THEN 1
          WHEN Licencia = 'GC Core Use' THEN 2
          WHEN Licencia = 'GD Self-Service Use' THEN 3
          ELSE 4
        END
    ) AS rn
  FROM `{lic}`
)
SELECT
  usuario,
  Licencia
FROM LicenciasOrdenadas
WHERE rn = 1
ORDER BY
  CASE
    WHEN Licencia = 'GB Advanced Use' THEN 1
    WHEN Licencia = 'GC Core Use' THEN 2
    WHEN Licencia = 'GD Self-Service Use' THEN 3
    ELSE 4
  END,
  usuario
LIMIT 5";

fn bind(template: &str, cfg: &Config) -> String {
    template
        .replace("{fact}", &cfg.fact_table)
        .replace("{lic}", &cfg.license_table)
}

/// Builds the fixed route table. Table names are substituted into the SQL
/// templates here, once at startup; nothing is substituted per-request.
pub fn route_table(cfg: &Config) -> Vec<QueryRoute> {
    use ResultShape::{RowList, SingleRow};

    let mut table = vec![
        QueryRoute {
            path: "/usuarios",
            sql: bind(SQL_USUARIOS, cfg),
            shape: RowList,
            error_msg: "failed to retrieve users",
        },
        QueryRoute {
            path: "/niveles_riesgo",
            sql: bind(SQL_NIVELES_RIESGO, cfg),
            shape: RowList,
            error_msg: "failed to retrieve risk levels",
        },
        QueryRoute {
            path: "/desc_proc_emp",
            sql: bind(SQL_DESC_PROC_EMP, cfg),
            shape: RowList,
            error_msg: "failed to retrieve business process data",
        },
        QueryRoute {
            path: "/usuarios_frecuencia",
            sql: bind(SQL_USUARIOS_FRECUENCIA, cfg),
            shape: RowList,
            error_msg: "failed to retrieve user frequency data",
        },
        QueryRoute {
            path: "/usuarios_por_proceso",
            sql: bind(SQL_USUARIOS_POR_PROCESO, cfg),
            shape: RowList,
            error_msg: "failed to retrieve users per business process",
        },
        QueryRoute {
            path: "/conteoSOD",
            sql: bind(SQL_CONTEO_SOD, cfg),
            shape: SingleRow,
            error_msg: "failed to retrieve the SOD risk user count",
        },
        QueryRoute {
            path: "/conteoAC",
            sql: bind(SQL_CONTEO_AC, cfg),
            shape: SingleRow,
            error_msg: "failed to retrieve the AC risk user count",
        },
        QueryRoute {
            path: "/totalUsers",
            sql: bind(SQL_TOTAL_USERS, cfg),
            shape: SingleRow,
            error_msg: "failed to retrieve the total user count",
        },
        QueryRoute {
            path: "/usuarios_riesgos",
            sql: bind(SQL_USUARIOS_RIESGOS, cfg),
            shape: SingleRow,
            error_msg: "failed to retrieve user risk rows",
        },
    ];

    if cfg.license_routes() {
        table.push(QueryRoute {
            path: "/usuarios_licencias",
            sql: bind(SQL_USUARIOS_LICENCIAS, cfg),
            shape: RowList,
            error_msg: "failed to retrieve license counts",
        });
        table.push(QueryRoute {
            path: "/usuarios_licencia_detalle",
            sql: bind(SQL_USUARIOS_LICENCIA_DETALLE, cfg),
            shape: RowList,
            error_msg: "failed to retrieve the license detail view",
        });
    }

    table
}
