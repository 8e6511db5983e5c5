// Table unique des autorisations: chaque handler demande une permission,
// le rôle du jeton de session décide.

use crate::models::enums::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageUsers,
    ManageFormations,
    ReviewDemandes,
    ManageDevis,
    DeleteDevis,
    ManageContrats,
    SignAsCentre,
    ManageInvoices,
    ManageDocuments,
    ManageInspections,
    ManageDiplomes,
    ManageFormulaires,
    ManageSignatures,
    ViewContributions,
    TraineeSpace,
    ClientSpace,
    Contribute,
}

impl Permission {
    pub fn allowed_roles(self) -> &'static [Role] {
        use Role::*;

        match self {
            Permission::ManageUsers
            | Permission::ManageFormations
            | Permission::DeleteDevis
            | Permission::SignAsCentre
            | Permission::ManageDiplomes
            | Permission::ViewContributions => &[Admin],

            Permission::ReviewDemandes
            | Permission::ManageDevis
            | Permission::ManageContrats
            | Permission::ManageInvoices
            | Permission::ManageDocuments
            | Permission::ManageInspections
            | Permission::ManageFormulaires
            | Permission::ManageSignatures => &[Admin, Gestionnaire],

            Permission::TraineeSpace => &[User],
            Permission::ClientSpace => &[Client],
            Permission::Contribute => &[Admin, Gestionnaire, User, Client, Contributor],
        }
    }

    pub fn allows(self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// Personnel du centre: accès à toutes les ressources des stagiaires
pub fn is_staff(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Gestionnaire)
}

/// Espace propriétaire (stagiaire ou client) utilisé par une route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSpace {
    Trainee,
    Client,
}

impl OwnerSpace {
    pub fn permission(self) -> Permission {
        match self {
            OwnerSpace::Trainee => Permission::TraineeSpace,
            OwnerSpace::Client => Permission::ClientSpace,
        }
    }
}
